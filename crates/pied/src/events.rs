use serde::Serialize;
use serde_with::DeserializeFromStr;
use strum::{Display as StrumDisplay, EnumString};

/// Line protocol spoken over the control socket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, DeserializeFromStr, EnumString, StrumDisplay,
)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Command {
    /// Open the menu at the cursor right away.
    Show,
    /// Put the overlay up and let the open policy decide.
    Arm,
    Hide,
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Command(Command),
    ConfigReload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        let cases = vec![
            ("show", Command::Show),
            ("SHOW", Command::Show),
            ("arm", Command::Arm),
            ("Hide", Command::Hide),
        ];
        for (line, expected) in cases {
            assert_eq!(line.parse::<Command>().unwrap(), expected);
        }
        assert!("open".parse::<Command>().is_err());
        assert_eq!(Command::Arm.to_string(), "arm");
    }
}
