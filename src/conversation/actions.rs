//! Inline keyboard callback data.

const CLASS_PREFIX: &str = "class_";
const LOCALE_PREFIX: &str = "LOCALE_";

/// What a keyboard button asks the bot to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Create,
    Status,
    Delete,
    About,
    Settings,
    Feedback,
    AdminMenu,
    ServerStats,
    ShutdownPanel,
    GetFeedback,
    ShutdownNormal,
    ShutdownImmediate,
    ShutdownBot,
    FeedbackDone,
    FeedbackReply,
    SelectClass(String),
    SelectLocale(String),
}

impl Action {
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "main_create" => Action::Create,
            "main_status" => Action::Status,
            "main_delete" => Action::Delete,
            "main_about" => Action::About,
            "main_setting" => Action::Settings,
            "main_feedback" => Action::Feedback,
            "main_admin" => Action::AdminMenu,
            "admin_stats" => Action::ServerStats,
            "admin_shutdown_basic" => Action::ShutdownPanel,
            "admin_get_feedback" => Action::GetFeedback,
            "shutdown_normal" => Action::ShutdownNormal,
            "shutdown_immediate" => Action::ShutdownImmediate,
            "shutdown_bot" => Action::ShutdownBot,
            "confirm_done" => Action::FeedbackDone,
            "confirm_reply" => Action::FeedbackReply,
            _ => {
                if let Some(class) = data.strip_prefix(CLASS_PREFIX) {
                    return (!class.is_empty()).then(|| Action::SelectClass(class.to_string()));
                }
                if let Some(code) = data.strip_prefix(LOCALE_PREFIX) {
                    return (!code.is_empty()).then(|| Action::SelectLocale(code.to_string()));
                }
                return None;
            }
        };
        Some(action)
    }

    /// Callback data carried by a button for this action.
    pub fn data(&self) -> String {
        match self {
            Action::Create => "main_create".to_string(),
            Action::Status => "main_status".to_string(),
            Action::Delete => "main_delete".to_string(),
            Action::About => "main_about".to_string(),
            Action::Settings => "main_setting".to_string(),
            Action::Feedback => "main_feedback".to_string(),
            Action::AdminMenu => "main_admin".to_string(),
            Action::ServerStats => "admin_stats".to_string(),
            Action::ShutdownPanel => "admin_shutdown_basic".to_string(),
            Action::GetFeedback => "admin_get_feedback".to_string(),
            Action::ShutdownNormal => "shutdown_normal".to_string(),
            Action::ShutdownImmediate => "shutdown_immediate".to_string(),
            Action::ShutdownBot => "shutdown_bot".to_string(),
            Action::FeedbackDone => "confirm_done".to_string(),
            Action::FeedbackReply => "confirm_reply".to_string(),
            Action::SelectClass(class) => format!("{}{}", CLASS_PREFIX, class),
            Action::SelectLocale(code) => format!("{}{}", LOCALE_PREFIX, code),
        }
    }

    /// Actions only allowlisted users may trigger.
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Action::AdminMenu
                | Action::ServerStats
                | Action::ShutdownPanel
                | Action::GetFeedback
                | Action::ShutdownNormal
                | Action::ShutdownImmediate
                | Action::ShutdownBot
                | Action::FeedbackDone
                | Action::FeedbackReply
        )
    }
}
