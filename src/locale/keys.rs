//! Message keys looked up in translation catalogs.

/// Display name of the catalog's language (used in the settings menu).
pub const LOCALE_NAME: &str = "locale_name";

// Main menu
pub const ABOUT_ME: &str = "about_me";
pub const ABOUT_TEXT: &str = "about_text";
pub const ABOUT_LABEL: &str = "about_label";
pub const NEW_CHARACTER: &str = "new_character";
pub const DELETE_CHARACTER: &str = "delete_character";
pub const GET_CHARACTER: &str = "get_character";
pub const FEEDBACK_LABEL: &str = "feedback_label";
pub const SETTINGS_LABEL: &str = "settings_label";
pub const ADMIN_LABEL: &str = "admin_label";

// Character creation
pub const CHOOSE_CLASS: &str = "choose_class";
pub const CLASSES_NOT_READY: &str = "classes_not_ready";
pub const ENTER_NAME: &str = "enter_name";
pub const NAME_INVALID: &str = "name_invalid";
pub const CHECK_NAME: &str = "check_name";

// Character deletion and status
pub const PRINT_CONFIRM: &str = "print_confirm";
pub const SENT_CHAR_DELETE: &str = "sent_char_delete";
pub const CANCEL_REQUEST: &str = "cancel_request";
pub const REQUESTED_STATUS: &str = "requested_status";

// Feedback
pub const ENTER_FEEDBACK: &str = "enter_feedback";
pub const FEEDBACK_TOO_LONG: &str = "feedback_too_long";
pub const FEEDBACK_SENT: &str = "feedback_sent";
pub const FEEDBACK_REPLY: &str = "feedback_reply";
pub const FEEDBACK_ITEM: &str = "feedback_item";
pub const NO_FEEDBACK: &str = "no_feedback";
pub const REQUESTED_FEEDBACK: &str = "requested_feedback";
pub const FEEDBACK_DONE: &str = "feedback_done";
pub const FEEDBACK_REPLY_LABEL: &str = "feedback_reply_label";
pub const ENTER_REPLY: &str = "enter_reply";
pub const REPLY_SENT: &str = "reply_sent";
pub const CONFIRM_SENT: &str = "confirm_sent";

// Settings
pub const CHOOSE_LOCALE: &str = "choose_locale";
pub const LOCALE_CHANGED: &str = "locale_changed";

// Admin
pub const SERVER_STATS: &str = "server_stats";
pub const REQUESTED_SERVER_STATUS: &str = "requested_server_status";
pub const GET_FEEDBACK_LABEL: &str = "get_feedback_label";
pub const SHUTDOWN_LABEL: &str = "shutdown_label";
pub const SHUTDOWN_PANEL: &str = "shutdown_panel";
pub const SHUTDOWN_NORMAL: &str = "shutdown_normal";
pub const SHUTDOWN_IMMEDIATE: &str = "shutdown_immediate";
pub const SHUTDOWN_BOT: &str = "shutdown_bot";
pub const SENT_SHUTDOWN: &str = "sent_shutdown";
pub const SENT_SHUTDOWN_IMMEDIATE: &str = "sent_shutdown_immediate";
pub const SENT_SHUTDOWN_BOT: &str = "sent_shutdown_bot";
pub const SERVER_OK: &str = "server_ok";

// Generic replies
pub const REQUEST_DONE: &str = "request_done";
pub const COMMAND_FAILED: &str = "command_failed";
pub const START_OVER: &str = "start_over";
pub const UNKNOWN_COMMAND: &str = "unknown_command";
pub const UNKNOWN_MESSAGE: &str = "unknown_message";

/// Every key the bot may look up; the shipped default catalog must define all of them.
pub const ALL: &[&str] = &[
    LOCALE_NAME,
    ABOUT_ME,
    ABOUT_TEXT,
    ABOUT_LABEL,
    NEW_CHARACTER,
    DELETE_CHARACTER,
    GET_CHARACTER,
    FEEDBACK_LABEL,
    SETTINGS_LABEL,
    ADMIN_LABEL,
    CHOOSE_CLASS,
    CLASSES_NOT_READY,
    ENTER_NAME,
    NAME_INVALID,
    CHECK_NAME,
    PRINT_CONFIRM,
    SENT_CHAR_DELETE,
    CANCEL_REQUEST,
    REQUESTED_STATUS,
    ENTER_FEEDBACK,
    FEEDBACK_TOO_LONG,
    FEEDBACK_SENT,
    FEEDBACK_REPLY,
    FEEDBACK_ITEM,
    NO_FEEDBACK,
    REQUESTED_FEEDBACK,
    FEEDBACK_DONE,
    FEEDBACK_REPLY_LABEL,
    ENTER_REPLY,
    REPLY_SENT,
    CONFIRM_SENT,
    CHOOSE_LOCALE,
    LOCALE_CHANGED,
    SERVER_STATS,
    REQUESTED_SERVER_STATUS,
    GET_FEEDBACK_LABEL,
    SHUTDOWN_LABEL,
    SHUTDOWN_PANEL,
    SHUTDOWN_NORMAL,
    SHUTDOWN_IMMEDIATE,
    SHUTDOWN_BOT,
    SENT_SHUTDOWN,
    SENT_SHUTDOWN_IMMEDIATE,
    SENT_SHUTDOWN_BOT,
    SERVER_OK,
    REQUEST_DONE,
    COMMAND_FAILED,
    START_OVER,
    UNKNOWN_COMMAND,
    UNKNOWN_MESSAGE,
];
