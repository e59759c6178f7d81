use super::{drain, open_station, print_json, CliResult};

pub async fn run(text: &str) -> CliResult {
    let mut station = open_station()?;
    station.say(text);
    drain(&mut station).await;
    print_json(&serde_json::json!({ "type": "spoken", "text": text }))
}
