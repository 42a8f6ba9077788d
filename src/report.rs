//! Report rendering: HTML email body and downloadable HTML document.
//!
//! Both wrap the plain scan message (see
//! [`update_watcher_scan::ScanResult::message`]) escaped and with line
//! breaks preserved.

use crate::mail::OutgoingMail;
use chrono::NaiveDateTime;
use update_watcher_config::{Branding, Settings};
use update_watcher_scan::ScanResult;

pub const EMAIL_SUBJECT: &str = "We've scanned your site, here's what we found";

const STYLE: &str = "body { font-family: sans-serif; font-size: 14px; color: #2f2f2f; }\n    \
                     p { margin: 0 0 1em; line-height: 1.5em; }";

const RULE: &str = r#"<hr style="margin: 20px 0; border: 0; border-bottom: 1px dotted #eee;" />"#;

const KEEP_UP_TO_DATE: &str = "It's important to keep your website up to date to ensure known \
                               security vulnerabilities are patched and secured.";

/// A rendered report ready to be written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReport {
    pub filename: String,
    pub date: String,
    pub html: String,
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Insert `<br />` before every newline.
pub fn nl2br(text: &str) -> String {
    text.replace('\n', "<br />\n")
}

fn message_html(message: &str) -> String {
    nl2br(&escape_html(message))
}

pub struct ReportRenderer {
    branding: Branding,
}

impl ReportRenderer {
    pub fn new(branding: Branding) -> Self {
        Self { branding }
    }

    pub fn sender_name(&self) -> &str {
        &self.branding.sender_name
    }

    fn signature(&self) -> String {
        let name = escape_html(&self.branding.sender_name);
        match &self.branding.website {
            Some(site) if !site.trim().is_empty() => {
                format!("<a href=\"{}\">{}</a>", escape_html(site.trim()), name)
            }
            _ => name,
        }
    }

    /// HTML email body.
    pub fn email_html(&self, name: &str, message: &str) -> String {
        format!(
            "<!doctype html>\n<html>\n<head>\n<style>\n    {STYLE}\n</style>\n</head>\n<body>\n\n\
             <p>Hi {name},<br />\n\
             We have completed a routine review of your website and determined that the \
             following items are out of date and should be updated:</p>\n\n\
             {RULE}\n\n<p>{message}</p>\n\n{RULE}\n\n\
             <p>{KEEP_UP_TO_DATE}</p>\n\n\
             <p>Kind regards,<br />\n{signature}</p>\n</body>\n</html>\n",
            name = escape_html(name),
            message = message_html(message),
            signature = self.signature(),
        )
    }

    /// HTML document report.
    pub fn document_html(&self, name: &str, message: &str, date: &str) -> String {
        format!(
            "<!doctype html>\n<html>\n<head>\n<style>\n    {STYLE}\n</style>\n</head>\n<body>\n\n\
             <p>{name}</p>\n\
             <p><strong>Report Date: </strong>{date}</p>\n\n\
             {RULE}\n\n<p>{message}</p>\n\n{RULE}\n\n\
             <p>{KEEP_UP_TO_DATE}</p>\n\n\
             <p>{signature}</p>\n</body>\n</html>\n",
            name = escape_html(name),
            date = escape_html(date),
            message = message_html(message),
            signature = self.signature(),
        )
    }

    /// Email for `result`, addressed per `settings`.
    pub fn email(&self, settings: &Settings, result: &ScanResult) -> OutgoingMail {
        let message = result.message();
        OutgoingMail {
            to: settings.recipients(),
            from: settings.notify_from.clone(),
            from_name: self.branding.sender_name.clone(),
            reply_to: self.branding.reply_to.clone(),
            subject: EMAIL_SUBJECT.to_string(),
            html_body: self.email_html(settings.greeting_name(), &message),
            text_body: Some(message),
        }
    }

    /// Downloadable report for `result`, dated `now`.
    pub fn document(
        &self,
        settings: &Settings,
        result: &ScanResult,
        now: NaiveDateTime,
    ) -> DocumentReport {
        let date = now.format("%a, %d %b %Y %H:%M:%S").to_string();
        DocumentReport {
            filename: format!("updates-report-{}.html", now.format("%d_%m_%Y_%H_%M_%S")),
            html: self.document_html(settings.greeting_name(), &result.message(), &date),
            date,
        }
    }
}
