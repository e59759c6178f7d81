use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Longest interval an editor may pick.
pub const MAX_INTERVAL_MINUTES: i64 = 60;

/// A user-editable recurring announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerConfig {
    pub id: String,
    pub name: String,
    pub interval_minutes: i64,
    pub messages: Vec<String>,
    pub enabled: bool,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
}

/// Partial update merged into a [`TimerConfig`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerPatch {
    pub name: Option<String>,
    pub interval_minutes: Option<i64>,
    pub messages: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

impl TimerConfig {
    /// Interval as a chrono duration. Only called on validated configs, whose
    /// interval lies in `1..=MAX_INTERVAL_MINUTES`.
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.interval_minutes)
    }

    /// Drop blank messages and check the remaining invariants.
    pub fn sanitize(mut self) -> Result<Self, ValidationError> {
        self.messages.retain(|m| !m.trim().is_empty());
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.interval_minutes) {
            return Err(ValidationError::InvalidInterval {
                id: self.id.clone(),
                minutes: self.interval_minutes,
            });
        }
        if self.messages.iter().all(|m| m.trim().is_empty()) {
            return Err(ValidationError::EmptyMessages {
                id: self.id.clone(),
            });
        }
        Ok(())
    }

    /// Apply `patch` and return the merged, sanitized config. `self` is left
    /// untouched if the result would be invalid.
    pub fn merged(&self, patch: &TimerPatch) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(minutes) = patch.interval_minutes {
            next.interval_minutes = minutes;
        }
        if let Some(messages) = &patch.messages {
            next.messages = messages.clone();
        }
        if let Some(enabled) = patch.enabled {
            next.enabled = enabled;
        }
        if let Some(icon) = &patch.icon {
            next.icon = icon.clone();
        }
        if let Some(color) = &patch.color {
            next.color = color.clone();
        }
        next.sanitize()
    }
}

/// The timers a fresh installation starts with.
pub fn default_timers() -> Vec<TimerConfig> {
    vec![
        TimerConfig {
            id: "announcements".into(),
            name: "Avisos".into(),
            interval_minutes: 30,
            messages: vec![
                "Atenção atletas! Lembrem-se de se hidratar durante o treino.".into(),
                "Aviso importante: mantenha sua toalha sempre com você.".into(),
                "Lembre-se de guardar os equipamentos após o uso.".into(),
                "Atenção: respeite o limite de tempo nos aparelhos.".into(),
            ],
            enabled: true,
            icon: "📢".into(),
            color: "primary".into(),
        },
        TimerConfig {
            id: "ads".into(),
            name: "Propagandas".into(),
            interval_minutes: 10,
            messages: vec![
                "Conheça nossos planos especiais com desconto! Fale com a recepção.".into(),
                "Aulas de spinning e funcional com vagas abertas. Inscreva-se já!".into(),
                "Traga um amigo e ganhe 30 dias grátis!".into(),
                "Suplementos com preço especial na nossa loja.".into(),
            ],
            enabled: true,
            icon: "🎯".into(),
            color: "accent".into(),
        },
        TimerConfig {
            id: "motivation".into(),
            name: "Motivação".into(),
            interval_minutes: 20,
            messages: vec![
                "Você está indo muito bem! Continue assim!".into(),
                "Cada repetição te deixa mais forte. Não desista!".into(),
                "O único treino ruim é o que você não faz. Parabéns por estar aqui!".into(),
                "Sua dedicação de hoje é o resultado de amanhã!".into(),
                "Força, foco e determinação! Você consegue!".into(),
            ],
            enabled: true,
            icon: "💪".into(),
            color: "success".into(),
        },
    ]
}
