//! Referral tokens carried by the bot's `/start` command.
//!
//! Deep links arrive as `/start <invitor-uid>`; a bare `/start` carries no
//! token.

use mosq_types::Uid;

/// Extract the inviting uid from `/start` command text.
///
/// The text is split on whitespace and the second token, if any, is the
/// token. Anything after it is ignored. A token that cannot be a uid yields
/// `None`.
pub fn referral_token(text: &str) -> Option<Uid> {
    text.split_whitespace()
        .nth(1)
        .and_then(|token| Uid::parse(token).ok())
}
