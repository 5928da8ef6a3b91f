/// External automation actions as data values, so one executor's retry and
/// backoff machinery covers every action kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationCommand {
    /// Deliver `text` to `recipient` through the Messages app.
    SendMessage { recipient: String, text: String },

    /// Open a compose window addressed to `recipient` and type a placeholder
    /// dot, surfacing a typing indicator on the recipient's side.
    ShowTypingIndicator { recipient: String },

    /// Select-all, delete, escape in the frontmost compose field: clears
    /// the placeholder dot and closes the window.
    ClearCompose,
}

impl AutomationCommand {
    /// Short human-readable form for log lines.
    pub fn describe(&self) -> String {
        match self {
            Self::SendMessage { recipient, .. } => format!("send message to {recipient}"),
            Self::ShowTypingIndicator { recipient } => {
                format!("show typing indicator for {recipient}")
            }
            Self::ClearCompose => "clear compose field".to_string(),
        }
    }

    /// Render the AppleScript source for this command.  Payloads are escaped
    /// before being embedded in the script's string literals.
    pub fn to_script(&self) -> String {
        match self {
            Self::SendMessage { recipient, text } => {
                let recipient = escape_applescript(recipient);
                let text = escape_applescript(text);
                format!(
                    r#"tell application "Messages"
    set targetService to 1st account whose service type = iMessage
    set targetBuddy to participant "{recipient}" of targetService
    send "{text}" to targetBuddy
end tell"#
                )
            }

            Self::ShowTypingIndicator { recipient } => {
                let recipient = escape_applescript(recipient);
                format!(
                    r#"tell application "Messages"
    activate
end tell

delay 0.5

tell application "System Events"
    tell process "Messages"
        try
            set frontmost to true
            delay 0.3

            keystroke "n" using command down
            delay 0.4

            keystroke "{recipient}"
            delay 0.4

            keystroke tab
            delay 0.2

            keystroke "."

        on error errMsg
            log errMsg
        end try
    end tell
end tell"#
                )
            }

            Self::ClearCompose => r#"tell application "System Events"
    tell process "Messages"
        try
            keystroke "a" using command down
            delay 0.05
            key code 51
            delay 0.05
            key code 53
        on error errMsg
            log errMsg
        end try
    end tell
end tell"#
                .to_string(),
        }
    }
}

/// Escape a string for embedding inside a double-quoted AppleScript literal.
/// Backslash, double quote, newline and carriage return are the characters
/// the script syntax requires escaped; the mapping round-trips through
/// AppleScript's own unescaping.
pub fn escape_applescript(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// AppleScript-side unescaping, for round-trip checks.
    fn unescape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut chars = text.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                out.push(ch);
                continue;
            }
            match chars.next() {
                Some('\\') => out.push('\\'),
                Some('"') => out.push('"'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        }
        out
    }

    #[test]
    fn escapes_each_special_character() {
        assert_eq!(escape_applescript(r"a\b"), r"a\\b");
        assert_eq!(escape_applescript(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(escape_applescript("line1\nline2"), r"line1\nline2");
        assert_eq!(escape_applescript("cr\rhere"), r"cr\rhere");
        assert_eq!(escape_applescript("plain"), "plain");
    }

    #[test]
    fn escaping_round_trips() {
        let nasty = "back\\slash \"quotes\"\nnew\rline \\n literal";
        let escaped = escape_applescript(nasty);

        assert_eq!(unescape(&escaped), nasty);
        assert_eq!(escape_applescript(&unescape(&escaped)), escaped);
    }

    #[test]
    fn send_script_embeds_escaped_payload() {
        let command = AutomationCommand::SendMessage {
            recipient: "+15551234567".into(),
            text: "hello \"world\"\nbye".into(),
        };

        let script = command.to_script();
        assert!(script.contains(r#"participant "+15551234567""#));
        assert!(script.contains(r#"send "hello \"world\"\nbye""#));
        // The raw newline must never appear inside the string literal
        assert!(!script.contains("hello \"world\"\n"));
    }

    #[test]
    fn typing_scripts_target_messages_process() {
        let show = AutomationCommand::ShowTypingIndicator {
            recipient: "+15551234567".into(),
        }
        .to_script();
        assert!(show.contains(r#"keystroke "+15551234567""#));
        assert!(show.contains(r#"keystroke ".""#));

        let clear = AutomationCommand::ClearCompose.to_script();
        assert!(clear.contains("key code 51"));
    }
}
