use serde::{Deserialize, Serialize};

/// Value returned for any key missing from the config store.
pub const MISSING_VALUE: &str = "0";

pub const DEFAULT_FORUM_NAME: &str = "Agora";
pub const DEFAULT_FROM_MAIL: &str = "admin@example.com";
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// The full externally visible settings surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ForumName,
    HeaderMsg,
    SignupDisabled,
    GroupCreationDisabled,
    ImageUploadEnabled,
    FileUploadEnabled,
    AllowGroupSubscription,
    AllowTopicSubscription,
    DataDir,
    DefaultFromMail,
    SmtpHost,
    SmtpPort,
    SmtpUser,
    SmtpPass,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 14] = [
        Self::ForumName,
        Self::HeaderMsg,
        Self::SignupDisabled,
        Self::GroupCreationDisabled,
        Self::ImageUploadEnabled,
        Self::FileUploadEnabled,
        Self::AllowGroupSubscription,
        Self::AllowTopicSubscription,
        Self::DataDir,
        Self::DefaultFromMail,
        Self::SmtpHost,
        Self::SmtpPort,
        Self::SmtpUser,
        Self::SmtpPass,
    ];

    /// Key under which the setting is stored.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ForumName => "forum_name",
            Self::HeaderMsg => "header_msg",
            Self::SignupDisabled => "signup_disabled",
            Self::GroupCreationDisabled => "group_creation_disabled",
            Self::ImageUploadEnabled => "image_upload_enabled",
            Self::FileUploadEnabled => "file_upload_enabled",
            Self::AllowGroupSubscription => "allow_group_subscription",
            Self::AllowTopicSubscription => "allow_topic_subscription",
            Self::DataDir => "data_dir",
            Self::DefaultFromMail => "default_from_mail",
            Self::SmtpHost => "smtp_host",
            Self::SmtpPort => "smtp_port",
            Self::SmtpUser => "smtp_user",
            Self::SmtpPass => "smtp_pass",
        }
    }
}

/// Typed snapshot of the config store, loaded once at startup and passed
/// by reference to whatever needs a setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumConfig {
    pub forum_name: String,
    pub header_msg: String,
    pub signup_disabled: bool,
    pub group_creation_disabled: bool,
    pub image_upload_enabled: bool,
    pub file_upload_enabled: bool,
    pub allow_group_subscription: bool,
    pub allow_topic_subscription: bool,
    pub data_dir: String,
    pub default_from_mail: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    #[serde(skip_serializing, default)]
    pub smtp_pass: String,
}

impl Default for ForumConfig {
    /// The settings a fresh install is seeded with.
    fn default() -> Self {
        Self {
            forum_name: DEFAULT_FORUM_NAME.to_string(),
            header_msg: String::new(),
            signup_disabled: false,
            group_creation_disabled: false,
            image_upload_enabled: false,
            file_upload_enabled: false,
            allow_group_subscription: false,
            allow_topic_subscription: false,
            data_dir: String::new(),
            default_from_mail: DEFAULT_FROM_MAIL.to_string(),
            smtp_host: String::new(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: String::new(),
            smtp_pass: String::new(),
        }
    }
}

impl ForumConfig {
    /// Build from raw string values. `lookup` must follow the store's
    /// convention of returning "0" for missing keys.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(ConfigKey) -> String,
    {
        let mut flag = |key: ConfigKey| decode_flag(&lookup(key));
        let signup_disabled = flag(ConfigKey::SignupDisabled);
        let group_creation_disabled = flag(ConfigKey::GroupCreationDisabled);
        let image_upload_enabled = flag(ConfigKey::ImageUploadEnabled);
        let file_upload_enabled = flag(ConfigKey::FileUploadEnabled);
        let allow_group_subscription = flag(ConfigKey::AllowGroupSubscription);
        let allow_topic_subscription = flag(ConfigKey::AllowTopicSubscription);

        Self {
            forum_name: lookup(ConfigKey::ForumName),
            header_msg: lookup(ConfigKey::HeaderMsg),
            signup_disabled,
            group_creation_disabled,
            image_upload_enabled,
            file_upload_enabled,
            allow_group_subscription,
            allow_topic_subscription,
            data_dir: lookup(ConfigKey::DataDir),
            default_from_mail: lookup(ConfigKey::DefaultFromMail),
            smtp_host: lookup(ConfigKey::SmtpHost),
            smtp_port: lookup(ConfigKey::SmtpPort)
                .parse()
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: lookup(ConfigKey::SmtpUser),
            smtp_pass: lookup(ConfigKey::SmtpPass),
        }
    }

    /// Encoded (key, value) pairs in store format, one per `ConfigKey`.
    pub fn to_pairs(&self) -> Vec<(ConfigKey, String)> {
        ConfigKey::ALL
            .iter()
            .map(|&key| {
                let value = match key {
                    ConfigKey::ForumName => self.forum_name.clone(),
                    ConfigKey::HeaderMsg => self.header_msg.clone(),
                    ConfigKey::SignupDisabled => encode_flag(self.signup_disabled),
                    ConfigKey::GroupCreationDisabled => encode_flag(self.group_creation_disabled),
                    ConfigKey::ImageUploadEnabled => encode_flag(self.image_upload_enabled),
                    ConfigKey::FileUploadEnabled => encode_flag(self.file_upload_enabled),
                    ConfigKey::AllowGroupSubscription => encode_flag(self.allow_group_subscription),
                    ConfigKey::AllowTopicSubscription => encode_flag(self.allow_topic_subscription),
                    ConfigKey::DataDir => self.data_dir.clone(),
                    ConfigKey::DefaultFromMail => self.default_from_mail.clone(),
                    ConfigKey::SmtpHost => self.smtp_host.clone(),
                    ConfigKey::SmtpPort => self.smtp_port.to_string(),
                    ConfigKey::SmtpUser => self.smtp_user.clone(),
                    ConfigKey::SmtpPass => self.smtp_pass.clone(),
                };
                (key, value)
            })
            .collect()
    }
}

pub fn encode_flag(value: bool) -> String {
    String::from(if value { "1" } else { "0" })
}

pub fn decode_flag(value: &str) -> bool {
    value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn keys_are_distinct() {
        let mut seen: Vec<&str> = ConfigKey::ALL.iter().map(|k| k.as_str()).collect();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), ConfigKey::ALL.len());
    }

    #[test]
    fn lookup_of_own_pairs_reproduces_config() {
        let config = ForumConfig {
            forum_name: "Hackers".into(),
            signup_disabled: true,
            allow_topic_subscription: true,
            smtp_port: 587,
            smtp_pass: "hunter2".into(),
            ..ForumConfig::default()
        };
        let stored: HashMap<ConfigKey, String> = config.to_pairs().into_iter().collect();
        let loaded = ForumConfig::from_lookup(|key| stored[&key].clone());
        assert_eq!(loaded, config);
    }

    #[test]
    fn empty_store_decodes_to_flags_off() {
        let loaded = ForumConfig::from_lookup(|_| MISSING_VALUE.to_string());
        assert!(!loaded.signup_disabled);
        assert!(!loaded.image_upload_enabled);
        assert_eq!(loaded.forum_name, "0");
        // "0" parses as a port, anything unparseable falls back to the default
        assert_eq!(loaded.smtp_port, 0);

        let garbled = ForumConfig::from_lookup(|key| match key {
            ConfigKey::SmtpPort => "not-a-port".into(),
            _ => String::new(),
        });
        assert_eq!(garbled.smtp_port, DEFAULT_SMTP_PORT);
    }

    #[test]
    fn smtp_password_is_not_serialized() {
        let config = ForumConfig {
            smtp_pass: "secret".into(),
            ..ForumConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
        assert!(json.contains("\"forum_name\":\"Agora\""));
    }
}
