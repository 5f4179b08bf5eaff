//! Engine configuration and numeric constants.
//!
//! A `Config` is attached to a matrix at creation time and never changes
//! afterwards. The boolean flags gate optional features (translation,
//! expansion, the MNA pre-order pass, diagonal pivoting, the optional
//! diagnostics); the numeric knobs tune pivot selection and partitioning.

/// Scaling bound used by the condition estimator. Intermediate vectors are
/// rescaled whenever a component's magnitude exceeds this value.
pub const SLACK: f64 = 1e4;

/// Largest count for which a Markowitz product is formed by plain integer
/// multiply. Above this, the product is formed in floating point and clamped.
pub const LARGEST_SHORT_INTEGER: i64 = 32_767;

/// Saturation value for clamped Markowitz products.
pub const LARGEST_LONG_INTEGER: i64 = 2_147_483_647;

/// Machine epsilon for f64, used by the roundoff bound.
pub const MACHINE_RESOLUTION: f64 = f64::EPSILON;

/// Address-mode selection for the refactorization loop.
///
/// In direct mode a step gathers its column into a dense scratch vector,
/// eliminates there, and scatters back; in indirect mode the same update runs
/// through the element links. `Auto` chooses per-step from operation counts
/// collected at partition time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartitionMode {
    /// Use the mode from `Config::default_partition`.
    #[default]
    Default,
    /// Force direct addressing for every step.
    Direct,
    /// Force indirect addressing for every step.
    Indirect,
    /// Pick per-step based on column population counts.
    Auto,
}

/// Verbosity of optional status reporting through the `log` facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Annotate {
    /// Emit nothing.
    #[default]
    None,
    /// Log pivot-selection status for each elimination step.
    OnStrangeBehavior,
    /// Additionally log partition statistics.
    Full,
}

/// Creation-time configuration for a [`Matrix`](crate::Matrix).
#[derive(Debug, Clone)]
pub struct Config {
    /// Real-arithmetic factor/solve paths are available.
    pub real: bool,
    /// Complex-arithmetic paths are available; element imaginary parts are used.
    pub complex: bool,
    /// Complex vectors are passed as separate (re, im) arrays. When false,
    /// a single interleaved array of length `2 * (n + 1)` is used, with the
    /// pair (re, im) at indices (2i, 2i + 1).
    pub separated_complex_vectors: bool,
    /// References past the declared size grow the matrix.
    pub expandable: bool,
    /// Maintain external-to-internal index maps, assigning internal slots in
    /// first-seen order.
    pub translate: bool,
    /// Track per-element init-info so `initialize` can restore baselines.
    pub initialize: bool,
    /// The matrix comes from modified nodal analysis; `mna_preorder` is
    /// meaningful.
    pub modified_nodal: bool,
    /// Enable the two diagonal-restricted pivot search strategies.
    pub diagonal_pivoting: bool,
    /// The caller intends to solve against the transposed system; affects the
    /// direction used when verifying a solution against the stamped values.
    pub transpose: bool,
    /// Gate the roundoff / largest-element stability diagnostics.
    pub stability: bool,
    /// Gate the reciprocal condition-number estimator.
    pub condition: bool,
    /// Gate the extremal-pivot-ratio pseudo-condition diagnostic.
    pub pseudo_condition: bool,
    /// Gate the determinant diagnostic.
    pub determinant: bool,
    /// Gate the matrix-vector multiply used for residual checks.
    pub multiplication: bool,
    /// Relative pivot threshold used when the caller passes none.
    pub default_threshold: f64,
    /// Tie-count bound factor for the exhaustive pivot searches.
    pub ties_multiplier: i64,
    /// Address mode installed when `partition` is called with
    /// [`PartitionMode::Default`].
    pub default_partition: PartitionMode,
    /// Status-report verbosity.
    pub annotate: Annotate,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            real: true,
            complex: true,
            separated_complex_vectors: false,
            expandable: true,
            translate: true,
            initialize: false,
            modified_nodal: true,
            diagonal_pivoting: true,
            transpose: false,
            stability: true,
            condition: true,
            pseudo_condition: true,
            determinant: true,
            multiplication: true,
            default_threshold: 1e-3,
            ties_multiplier: 5,
            default_partition: PartitionMode::Auto,
            annotate: Annotate::None,
        }
    }
}

impl Config {
    /// A real-only profile: no imaginary storage is touched and the complex
    /// solve paths report a mismatch.
    pub fn real_only() -> Self {
        Self {
            complex: false,
            ..Self::default()
        }
    }
}
