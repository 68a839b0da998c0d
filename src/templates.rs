pub const INITIAL_HTML: &str = include_str!("../templates/initial.html");
pub const REMINDER_HTML: &str = include_str!("../templates/reminder.html");
pub const THANK_YOU_HTML: &str = include_str!("../templates/thank_you.html");
