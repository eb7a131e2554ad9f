//! Embedded prompts
//!
//! Compiled into the binary from the .pmt files in `prompts/`.

/// Rigor instruction used as the system prompt for drafting and correction
pub const DRAFT: &str = include_str!("../../prompts/draft.pmt");

/// Self-review instruction for the second drafting pass
pub const SELF_IMPROVEMENT: &str = include_str!("../../prompts/self_improvement.pmt");

/// Correction instruction, sent together with the verifier's bug report
pub const CORRECTION: &str = include_str!("../../prompts/correction.pmt");

/// System prompt putting the model in the verifier role
pub const VERIFICATION_SYSTEM: &str = include_str!("../../prompts/verification_system.pmt");

/// Reminder appended to every verification request
pub const VERIFICATION_REMINDER: &str = include_str!("../../prompts/verification_reminder.pmt");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_prompt() {
        assert!(DRAFT.contains("Rigor is Paramount"));
        assert!(DRAFT.contains("Detailed Solution"));
    }

    #[test]
    fn test_self_improvement_prompt() {
        assert!(SELF_IMPROVEMENT.contains("improve your solution"));
    }

    #[test]
    fn test_correction_prompt() {
        assert!(CORRECTION.contains("bug report"));
    }

    #[test]
    fn test_verification_prompts() {
        assert!(VERIFICATION_SYSTEM.contains("verifier"));
        assert!(VERIFICATION_SYSTEM.contains("Detailed Verification"));
        assert!(VERIFICATION_REMINDER.contains("step by step"));
    }
}
