/*!
 * Overwrite planning: resolve a configured pattern sequence into the
 * concrete passes a single target needs
 */

use crate::ensure;
use crate::error::Result;
use crate::types::PatternKind;

/// Concrete byte source for one pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// The same byte repeated across the whole span
    Byte(u8),
    /// Fresh cryptographically random bytes for every chunk
    Random,
}

/// One fully resolved overwrite pass
#[derive(Debug, Clone, Copy)]
pub struct Pass {
    /// Pattern the pass was derived from
    pub pattern: PatternKind,
    /// Resolved byte source
    pub fill: Fill,
}

/// Per-target overwrite schedule. Built once, then executed verbatim.
#[derive(Debug, Clone)]
pub struct OverwritePlan {
    /// Passes in execution order
    pub passes: Vec<Pass>,
    /// Bytes every pass covers
    pub span: u64,
}

impl OverwritePlan {
    /// True when the target has nothing to overwrite
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Total bytes the plan will write, for progress accounting
    pub fn total_bytes(&self) -> u64 {
        self.span * self.passes.len() as u64
    }
}

/// Build the overwrite plan for one target.
///
/// The configured sequence is cycled until `pass_count` passes are laid
/// out. A plan always ends on a random pass: if the cycled sequence does
/// not, one extra random pass is appended. A zero span produces an empty
/// plan, since an empty unallocated file has no content to destroy.
pub fn build_plan(pass_count: usize, sequence: &[PatternKind], span: u64) -> Result<OverwritePlan> {
    ensure!(!sequence.is_empty(), Config, "pattern sequence is empty");

    if span == 0 {
        return Ok(OverwritePlan {
            passes: Vec::new(),
            span,
        });
    }

    let mut passes = Vec::with_capacity(pass_count + 1);
    let mut prev_fill = None;
    for index in 0..pass_count {
        let pattern = sequence[index % sequence.len()];
        let fill = resolve_fill(pattern, prev_fill);
        prev_fill = Some(fill);
        passes.push(Pass { pattern, fill });
    }

    if passes.last().map(|pass| pass.fill) != Some(Fill::Random) {
        passes.push(Pass {
            pattern: PatternKind::Random,
            fill: Fill::Random,
        });
    }

    Ok(OverwritePlan { passes, span })
}

/// Resolve one pattern against the previous pass's fill.
///
/// Complementary flips the previous fixed byte; when the previous pass was
/// random (or there is none), it falls back to 0xAA.
fn resolve_fill(pattern: PatternKind, prev: Option<Fill>) -> Fill {
    match pattern {
        PatternKind::Zeros => Fill::Byte(0x00),
        PatternKind::Ones => Fill::Byte(0xFF),
        PatternKind::Random => Fill::Random,
        PatternKind::Complementary => match prev {
            Some(Fill::Byte(byte)) => Fill::Byte(!byte),
            _ => Fill::Byte(0xAA),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fills(plan: &OverwritePlan) -> Vec<Fill> {
        plan.passes.iter().map(|pass| pass.fill).collect()
    }

    #[test]
    fn default_sequence_already_ends_random() {
        let sequence = [PatternKind::Zeros, PatternKind::Ones, PatternKind::Random];
        let plan = build_plan(3, &sequence, 4096).unwrap();
        assert_eq!(
            fills(&plan),
            vec![Fill::Byte(0x00), Fill::Byte(0xFF), Fill::Random]
        );
    }

    #[test]
    fn short_sequence_cycles_and_appends_final_random() {
        let sequence = [PatternKind::Zeros, PatternKind::Ones];
        let plan = build_plan(5, &sequence, 4096).unwrap();
        assert_eq!(plan.passes.len(), 6);
        assert_eq!(plan.passes[4].fill, Fill::Byte(0x00));
        assert_eq!(plan.passes[5].fill, Fill::Random);
        assert_eq!(plan.passes[5].pattern, PatternKind::Random);
    }

    #[test]
    fn single_fixed_pass_gains_a_terminal_random() {
        let sequence = [PatternKind::Zeros];
        let plan = build_plan(1, &sequence, 4096).unwrap();
        assert_eq!(fills(&plan), vec![Fill::Byte(0x00), Fill::Random]);
    }

    #[test]
    fn complementary_flips_previous_fixed_byte() {
        let sequence = [PatternKind::Ones, PatternKind::Complementary];
        let plan = build_plan(2, &sequence, 4096).unwrap();
        assert_eq!(plan.passes[0].fill, Fill::Byte(0xFF));
        assert_eq!(plan.passes[1].fill, Fill::Byte(0x00));
        // appended terminal random pass
        assert_eq!(plan.passes[2].fill, Fill::Random);
    }

    #[test]
    fn complementary_after_random_falls_back() {
        let sequence = [PatternKind::Random, PatternKind::Complementary];
        let plan = build_plan(2, &sequence, 4096).unwrap();
        assert_eq!(plan.passes[1].fill, Fill::Byte(0xAA));
    }

    #[test]
    fn complementary_leading_falls_back() {
        let sequence = [PatternKind::Complementary];
        let plan = build_plan(3, &sequence, 4096).unwrap();
        // 0xAA, then !0xAA, then !0x55 again
        assert_eq!(plan.passes[0].fill, Fill::Byte(0xAA));
        assert_eq!(plan.passes[1].fill, Fill::Byte(0x55));
        assert_eq!(plan.passes[2].fill, Fill::Byte(0xAA));
    }

    #[test]
    fn zero_span_yields_empty_plan() {
        let sequence = [PatternKind::Zeros];
        let plan = build_plan(3, &sequence, 0).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.total_bytes(), 0);
    }

    #[test]
    fn empty_sequence_is_rejected() {
        assert!(build_plan(3, &[], 4096).is_err());
    }

    #[test]
    fn total_bytes_accounts_for_every_pass() {
        let sequence = [PatternKind::Zeros, PatternKind::Ones, PatternKind::Random];
        let plan = build_plan(3, &sequence, 8192).unwrap();
        assert_eq!(plan.total_bytes(), 3 * 8192);
    }
}
