use super::effects::Notification;
use crate::workflows::leads::domain::Lead;

/// Subject/body pair with `{name}` and `{company}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub company: String,
    pub subject: String,
    pub body: String,
}

impl NotificationTemplate {
    pub fn welcome(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            subject: "Welcome to {company}!".to_string(),
            body: "Hi {name},\n\nThank you for your interest in our solutions. We'll be in touch soon."
                .to_string(),
        }
    }

    pub fn render(&self, lead: &Lead) -> Notification {
        let name = if lead.identity.name.is_empty() {
            "there"
        } else {
            lead.identity.name.as_str()
        };

        Notification {
            recipient: lead.identity.email.clone(),
            subject: self.fill(&self.subject, name),
            body: self.fill(&self.body, name),
        }
    }

    fn fill(&self, text: &str, name: &str) -> String {
        text.replace("{company}", &self.company)
            .replace("{name}", name)
    }
}

impl Default for NotificationTemplate {
    fn default() -> Self {
        Self::welcome("TechNova")
    }
}

/// Minimal shape check; anything stricter is the mail gateway's job.
pub(crate) fn is_deliverable(address: &str) -> bool {
    let address = address.trim();
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !address.contains(char::is_whitespace)
        }
        None => false,
    }
}
