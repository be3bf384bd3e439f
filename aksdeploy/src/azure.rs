//! Interpretation of Azure CLI output.
//!
//! The Azure CLI reports failures on stderr as
//! `ERROR: (Code) Message` followed by `Code: ...` / `Message: ...` lines.
//! The code is what separates an "already exists" conflict, which is safe to
//! ignore when ensuring a resource, from a genuine failure.

use serde::Deserialize;

/// Error codes meaning the resource being created is already there.
const ALREADY_EXISTS_CODES: [&str; 4] =
    ["AlreadyExists", "ResourceExists", "ResourceAlreadyExists", "ResourceGroupExists"];

const NOT_FOUND_CODES: [&str; 4] =
    ["NotFound", "ResourceNotFound", "ResourceGroupNotFound", "ParentResourceNotFound"];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    Other,
}

/// A failure reported by the Azure CLI.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AzureError {
    pub code: Option<String>,
    pub message: String,
}

impl AzureError {
    pub fn parse(diagnostics: &str) -> Self {
        let mut code = None;
        let mut message = None;

        for line in diagnostics.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix("Code:") {
                code = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("Message:") {
                message = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("ERROR:") {
                let rest = rest.trim();
                if let Some((inline_code, inline_message)) = rest
                    .strip_prefix('(')
                    .and_then(|rest| rest.split_once(')'))
                {
                    code = code.or_else(|| Some(inline_code.trim().to_string()));
                    message = message.or_else(|| Some(inline_message.trim().to_string()));
                } else if message.is_none() {
                    message = Some(rest.to_string());
                }
            }
        }

        Self {
            code: code.filter(|code| !code.is_empty()),
            message: message.unwrap_or_else(|| diagnostics.trim().to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.code.as_deref() {
            Some(code) if ALREADY_EXISTS_CODES.iter().any(|c| c.eq_ignore_ascii_case(code)) => {
                ErrorKind::AlreadyExists
            }
            Some(code) if NOT_FOUND_CODES.iter().any(|c| c.eq_ignore_ascii_case(code)) => {
                ErrorKind::NotFound
            }
            Some(_) => ErrorKind::Other,
            None if self.message.to_lowercase().contains("already exists") => {
                ErrorKind::AlreadyExists
            }
            None => ErrorKind::Other,
        }
    }
}

/// The subset of `az account show --output json` that is reported.
#[derive(Clone, Debug, Deserialize)]
pub struct Account {
    pub name: String,

    #[serde(default)]
    pub user: Option<AccountUser>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AccountUser {
    pub name: String,
}

/// The subset of `az acr show --output json` needed to tag images.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registry {
    pub login_server: String,
}

/// Parses the `true`/`false` printed by `az group exists`.
pub fn parse_bool(stdout: &str) -> Option<bool> {
    match stdout.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}
