//! Discord channel notification sink
//!
//! Posts the backup report as an embed, with the archive attached, to a guild
//! text channel through the Discord REST API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::DiscordConfig;
use crate::managers::backup::BackupArtifact;

/// Discord channel type of a regular guild text channel
const GUILD_TEXT_CHANNEL: u8 = 0;

/// Embed color of a backup report (green, #00FF00)
pub const SUCCESS_COLOR: u32 = 0x00FF00;

/// One labeled field of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured status message handed to a [`NotificationSink`]
#[derive(Debug, Clone)]
pub struct BackupReport {
    pub title: String,
    pub color: u32,
    pub fields: Vec<ReportField>,
    pub timestamp: DateTime<Utc>,
    pub footer: Option<String>,
}

impl BackupReport {
    /// Report for a verified archive
    pub fn for_artifact(
        artifact: &BackupArtifact,
        database: &str,
        next_run: DateTime<Utc>,
        footer: Option<String>,
    ) -> Self {
        let field = |name: &str, value: String| ReportField {
            name: name.to_string(),
            value,
            inline: false,
        };

        Self {
            title: "\u{1F4E6} Automatic Backup".to_string(), // Package
            color: SUCCESS_COLOR,
            fields: vec![
                field("Backup Date", format_backup_date(artifact.created_at)),
                field("Size", format!("{} MB", format_megabytes(artifact.size_bytes))),
                field("Database", format!("`{}`", database)),
                field("Stored File", format!("`{}`", artifact.archive_file_name())),
                field("Next Backup", format_next_run(next_run)),
            ],
            timestamp: artifact.created_at,
            footer,
        }
    }

    /// Value of the field called `name`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

/// File attached to a report
#[derive(Debug, Clone)]
pub struct Attachment {
    pub path: PathBuf,
    pub filename: String,
}

/// Destination for backup reports
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver `report` together with `attachment`
    async fn send(&self, report: &BackupReport, attachment: &Attachment) -> Result<()>;

    /// Sink name (for logging)
    fn name(&self) -> &str;
}

/// Size with two decimals, in MiB
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / (1024.0 * 1024.0))
}

/// Local `dd/mm/yyyy HH:MM:SS`
pub fn format_backup_date(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S").to_string()
}

/// Local `dd/mm/yyyy HH:MM`
pub fn format_next_run(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string()
}

/// Discord message payload (sent as `payload_json`)
#[derive(Debug, Serialize)]
struct DiscordPayload {
    embeds: Vec<DiscordEmbed>,
    attachments: Vec<DiscordAttachment>,
}

#[derive(Debug, Serialize)]
struct DiscordEmbed {
    title: String,
    color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<DiscordField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<DiscordFooter>,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct DiscordField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct DiscordFooter {
    text: String,
}

#[derive(Debug, Serialize)]
struct DiscordAttachment {
    id: u32,
    filename: String,
}

#[derive(Debug, Deserialize)]
struct ChannelInfo {
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Deserialize)]
struct GuildInfo {
    name: String,
}

/// Sends reports to a Discord text channel as the configured bot
pub struct DiscordNotifier {
    config: DiscordConfig,
    client: reqwest::Client,
}

impl DiscordNotifier {
    /// Create a new notifier
    pub fn new(config: DiscordConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    fn auth_header(&self) -> String {
        format!("Bot {}", self.config.token)
    }

    /// Name of the first guild the bot belongs to, if any
    pub async fn first_guild_name(&self) -> Result<Option<String>> {
        let response = self
            .client
            .get(self.endpoint("users/@me/guilds"))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("Failed to query Discord guilds")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Discord guild lookup failed with status {}: {}", status, body);
        }

        let guilds: Vec<GuildInfo> = response
            .json()
            .await
            .context("Failed to parse Discord guild list")?;
        Ok(guilds.into_iter().next().map(|g| g.name))
    }

    /// Fail unless the configured channel exists and is a guild text channel
    async fn ensure_text_channel(&self) -> Result<()> {
        let response = self
            .client
            .get(self.endpoint(&format!("channels/{}", self.config.channel_id)))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .context("Failed to look up Discord channel")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Channel {} not found (status {}): {}",
                self.config.channel_id,
                status,
                body
            );
        }

        let channel: ChannelInfo = response
            .json()
            .await
            .context("Failed to parse Discord channel")?;
        if channel.kind != GUILD_TEXT_CHANNEL {
            anyhow::bail!(
                "Channel {} is not a text channel (type {})",
                self.config.channel_id,
                channel.kind
            );
        }
        Ok(())
    }

    fn build_payload(report: &BackupReport, filename: &str) -> DiscordPayload {
        let embed = DiscordEmbed {
            title: report.title.clone(),
            color: report.color,
            fields: report
                .fields
                .iter()
                .map(|f| DiscordField {
                    name: f.name.clone(),
                    value: f.value.clone(),
                    inline: f.inline,
                })
                .collect(),
            footer: report
                .footer
                .as_ref()
                .map(|text| DiscordFooter { text: text.clone() }),
            timestamp: report.timestamp.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        };

        DiscordPayload {
            embeds: vec![embed],
            attachments: vec![DiscordAttachment {
                id: 0,
                filename: filename.to_string(),
            }],
        }
    }
}

#[async_trait]
impl NotificationSink for DiscordNotifier {
    async fn send(&self, report: &BackupReport, attachment: &Attachment) -> Result<()> {
        self.ensure_text_channel().await?;

        let payload = Self::build_payload(report, &attachment.filename);
        let payload_json =
            serde_json::to_string(&payload).context("Failed to serialize Discord payload")?;

        let bytes = tokio::fs::read(&attachment.path)
            .await
            .context(format!("Failed to read attachment {:?}", attachment.path))?;
        let file_part = Part::bytes(bytes)
            .file_name(attachment.filename.clone())
            .mime_str("application/zip")
            .context("Failed to build attachment part")?;

        let form = Form::new()
            .text("payload_json", payload_json)
            .part("files[0]", file_part);

        let response = self
            .client
            .post(self.endpoint(&format!("channels/{}/messages", self.config.channel_id)))
            .header("Authorization", self.auth_header())
            .multipart(form)
            .send()
            .await
            .context("Failed to send Discord message")?;

        let status = response.status();
        if status.is_success() {
            debug!("Discord message sent successfully");
            info!("Delivered {} to channel {}", attachment.filename, self.config.channel_id);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!("Discord message failed with status {}: {}", status, body);
            anyhow::bail!("Discord message failed with status {}: {}", status, body)
        }
    }

    fn name(&self) -> &str {
        "discord"
    }
}

/// Sinks for tests
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// A delivered report and the attachment it carried
    #[derive(Debug, Clone)]
    pub struct SentReport {
        pub report: BackupReport,
        pub attachment: Attachment,
        /// Whether the attachment existed on disk at send time
        pub attachment_existed: bool,
    }

    /// Records every report; optionally fails after recording
    #[derive(Clone, Default)]
    pub struct RecordingSink {
        pub sent: Arc<Mutex<Vec<SentReport>>>,
        failure: Option<String>,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing(message: &str) -> Self {
            Self {
                sent: Arc::default(),
                failure: Some(message.to_string()),
            }
        }

        pub fn sent(&self) -> Vec<SentReport> {
            self.sent.lock().unwrap().clone()
        }

        pub fn send_count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn send(&self, report: &BackupReport, attachment: &Attachment) -> Result<()> {
            let attachment_existed = attachment.path.exists();
            self.sent.lock().unwrap().push(SentReport {
                report: report.clone(),
                attachment: attachment.clone(),
                attachment_existed,
            });
            match self.failure {
                Some(ref message) => anyhow::bail!("{}", message),
                None => Ok(()),
            }
        }

        fn name(&self) -> &str {
            "recording"
        }
    }
}
