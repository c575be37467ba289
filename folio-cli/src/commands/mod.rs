pub mod deploy;
pub mod edit;
pub mod session;
pub mod status;

use colored::{ColoredString, Colorize};
use serde_json::Value;

/// Colour an outcome line by its `kind`: failures red, settled successes
/// green, everything in between yellow.
pub fn paint_outcome(data: &Value) -> ColoredString {
    let message = data["message"].as_str().unwrap_or_default();
    match data["outcome"]["kind"].as_str().unwrap_or_default() {
        "publish_failed" | "deploy_failed" | "deploy_timed_out" | "deploy_unreachable" => {
            message.red().bold()
        }
        "published" | "saved" => message.green().bold(),
        "deploying" => message.yellow(),
        _ => message.normal(),
    }
}
