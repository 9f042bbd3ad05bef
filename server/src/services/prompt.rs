//! System prompt — facility profile and its rendering.
//!
//! DESIGN
//! ======
//! The coach persona, pricing facts and tone rules live in a
//! [`FacilityProfile`]. The built-in profile describes Apex Forge; operators
//! can point `CHAT_PROFILE_PATH` at a YAML profile or replace the prompt
//! outright with `CHAT_SYSTEM_PROMPT`. The prompt is rendered once at startup
//! and never edited by callers.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("failed to read profile {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid profile: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("profile lists no membership tiers")]
    NoTiers,
}

/// One membership option the coach may recommend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTier {
    pub name: String,
    /// Display price, e.g. `$149/mo`.
    pub price: String,
    pub summary: String,
}

impl MembershipTier {
    fn new(name: &str, price: &str, summary: &str) -> Self {
        Self { name: name.into(), price: price.into(), summary: summary.into() }
    }
}

/// Facts and tone rules the system prompt is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityProfile {
    pub coach_name: String,
    /// How the coach is introduced, e.g. `friendly, highly-knowledgeable`.
    pub persona: String,
    pub facility: String,
    pub description: String,
    pub location: String,
    pub tone: String,
    pub tiers: Vec<MembershipTier>,
    pub tour: String,
    pub brevity: String,
}

impl Default for FacilityProfile {
    fn default() -> Self {
        Self {
            coach_name: "Forge".into(),
            persona: "friendly, highly-knowledgeable".into(),
            facility: "APEX FORGE FITNESS".into(),
            description: "an elite powerlifting and bodybuilding facility".into(),
            location: "Austin, TX".into(),
            tone: "You are welcoming, encouraging, and supportive.".into(),
            tiers: vec![
                MembershipTier::new("7-Day Pass", "$0", "Temporary Access"),
                MembershipTier::new(
                    "The Forge Pass",
                    "$149/mo",
                    "Complete 24/7 access, Competition-Grade Area, Cold Plunge & Sauna",
                ),
                MembershipTier::new(
                    "Apex Athlete",
                    "$299/mo",
                    "Everything in Forge Pass + 2x Personal Training Sessions/mo + Custom Diet App Access",
                ),
            ],
            tour: "If they ask to book a tour, politely direct them to the contact form at the bottom of the page \
                   or let them know they are welcome to walk in whenever they're ready."
                .into(),
            brevity: "Keep your responses EXTREMELY short and concise. Never write more than 2 or 3 sentences at a \
                      time. Do not list out all memberships unless explicitly asked. Be brief but friendly."
                .into(),
        }
    }
}

/// Render the system instruction for `profile`.
#[must_use]
pub fn render_system_prompt(profile: &FacilityProfile) -> String {
    let tiers = profile
        .tiers
        .iter()
        .map(|t| format!("- {}: {} ({})", t.name, t.price, t.summary))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are {coach}, the {persona} AI coach for {facility}, {description} in {location}. \n\
         {tone}\n\
         Help the user pick a membership plan:\n\
         {tiers}\n\
         \n\
         {tour}\n\
         \n\
         CRITICAL INSTRUCTION: {brevity}",
        coach = profile.coach_name,
        persona = profile.persona,
        facility = profile.facility,
        description = profile.description,
        location = profile.location,
        tone = profile.tone,
        tour = profile.tour,
        brevity = profile.brevity,
    )
}

/// Parse a YAML profile. Omitted fields take the built-in values.
///
/// # Errors
///
/// Returns [`ProfileError::Parse`] for invalid YAML and
/// [`ProfileError::NoTiers`] when the tier list is empty.
pub fn parse_profile(yaml: &str) -> Result<FacilityProfile, ProfileError> {
    let profile: FacilityProfile = serde_yaml::from_str(yaml)?;
    if profile.tiers.is_empty() {
        return Err(ProfileError::NoTiers);
    }
    Ok(profile)
}

/// Read and parse a YAML profile file.
///
/// # Errors
///
/// Returns [`ProfileError::Read`] if the file cannot be read, otherwise as
/// [`parse_profile`].
pub fn load_profile(path: &Path) -> Result<FacilityProfile, ProfileError> {
    let yaml = std::fs::read_to_string(path).map_err(|source| ProfileError::Read { path: path.to_path_buf(), source })?;
    parse_profile(&yaml)
}

/// Resolve the system prompt from the environment.
///
/// `CHAT_SYSTEM_PROMPT` wins when set and non-blank, then the profile at
/// `CHAT_PROFILE_PATH`, then the built-in profile.
///
/// # Errors
///
/// Returns an error if `CHAT_PROFILE_PATH` is set but cannot be loaded.
pub fn system_prompt_from_env() -> Result<String, ProfileError> {
    if let Some(prompt) = std::env::var("CHAT_SYSTEM_PROMPT")
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        info!(chars = prompt.len(), "system prompt: using CHAT_SYSTEM_PROMPT");
        return Ok(prompt);
    }

    let profile = match std::env::var("CHAT_PROFILE_PATH") {
        Ok(path) if !path.trim().is_empty() => {
            let profile = load_profile(Path::new(&path))?;
            info!(%path, facility = %profile.facility, "system prompt: loaded profile");
            profile
        }
        _ => FacilityProfile::default(),
    };
    Ok(render_system_prompt(&profile))
}

#[cfg(test)]
#[path = "prompt_test.rs"]
mod tests;
