//! Error diffusion kernel definitions.
//!
//! Each kernel specifies how quantization error is distributed to neighboring
//! pixels that have not been visited yet, and whether the algorithm writes its
//! output during the scan or re-quantizes the diffused buffer afterwards.

/// When an error diffusion algorithm commits its output colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// The quantized color is written during the diffusion scan.
    Immediate,
    /// The diffusion scan only accumulates error; a second full pass
    /// re-quantizes the error-adjusted buffer.
    Deferred,
}

/// An error diffusion kernel.
///
/// Each entry is `(dx, dy, weight)`: a neighbor offset relative to the current
/// pixel and its share of the error as `weight / divisor`. Offsets always point
/// forward in raster order (`dy > 0`, or `dy == 0` with `dx > 0`).
#[derive(Debug, Clone, Copy)]
pub struct DiffusionKernel {
    /// (dx, dy, weight) entries for error diffusion.
    pub entries: &'static [(i32, i32, u8)],

    /// Each neighbor receives `error * weight / divisor`.
    pub divisor: u8,

    pub pass_mode: PassMode,
}

impl DiffusionKernel {
    /// Sum of all weights.
    pub fn weight_sum(&self) -> u32 {
        self.entries.iter().map(|&(_, _, w)| w as u32).sum()
    }
}

/// Floyd-Steinberg dithering kernel.
///
/// ```text
///        X   7
///    3   5   1
/// ```
pub const FLOYD_STEINBERG: DiffusionKernel = DiffusionKernel {
    entries: &[
        (1, 0, 7),  // right
        (-1, 1, 3), // bottom-left
        (0, 1, 5),  // bottom
        (1, 1, 1),  // bottom-right
    ],
    divisor: 16,
    pass_mode: PassMode::Deferred,
};

/// Atkinson dithering kernel.
///
/// Propagates 6/8 of the error; the lost quarter keeps small palettes from
/// bleeding.
///
/// ```text
///        X   1   1
///    1   1   1
///        1
/// ```
pub const ATKINSON: DiffusionKernel = DiffusionKernel {
    entries: &[
        (1, 0, 1),  // right
        (2, 0, 1),  // two right
        (-1, 1, 1), // bottom-left
        (0, 1, 1),  // bottom
        (1, 1, 1),  // bottom-right
        (0, 2, 1),  // two below
    ],
    divisor: 8,
    pass_mode: PassMode::Immediate,
};

/// Stucki dithering kernel.
///
/// ```text
///            X   8   4
///    2   4   8   4   2
///    1   2   4   2   1
/// ```
pub const STUCKI: DiffusionKernel = DiffusionKernel {
    entries: &[
        (1, 0, 8),
        (2, 0, 4),
        (-2, 1, 2),
        (-1, 1, 4),
        (0, 1, 8),
        (1, 1, 4),
        (2, 1, 2),
        (-2, 2, 1),
        (-1, 2, 2),
        (0, 2, 4),
        (1, 2, 2),
        (2, 2, 1),
    ],
    divisor: 42,
    pass_mode: PassMode::Deferred,
};

/// Jarvis-Judice-Ninke dithering kernel.
///
/// ```text
///            X   7   5
///    3   5   7   5   3
///    1   3   5   3   1
/// ```
pub const JARVIS_JUDICE_NINKE: DiffusionKernel = DiffusionKernel {
    entries: &[
        (1, 0, 7),
        (2, 0, 5),
        (-2, 1, 3),
        (-1, 1, 5),
        (0, 1, 7),
        (1, 1, 5),
        (2, 1, 3),
        (-2, 2, 1),
        (-1, 2, 3),
        (0, 2, 5),
        (1, 2, 3),
        (2, 2, 1),
    ],
    divisor: 48,
    pass_mode: PassMode::Deferred,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floyd_steinberg_propagation_100_percent() {
        assert_eq!(FLOYD_STEINBERG.weight_sum(), 16, "Floyd-Steinberg weights should sum to 16");
        assert_eq!(FLOYD_STEINBERG.divisor, 16);
    }

    #[test]
    fn test_atkinson_propagation_75_percent() {
        assert_eq!(ATKINSON.weight_sum(), 6, "Atkinson should have 6 weight units");
        assert_eq!(ATKINSON.divisor, 8);
    }

    #[test]
    fn test_stucki_propagation_100_percent() {
        assert_eq!(STUCKI.weight_sum(), 42, "Stucki weights should sum to 42");
        assert_eq!(STUCKI.divisor, 42);
    }

    #[test]
    fn test_jarvis_judice_ninke_propagation_100_percent() {
        assert_eq!(JARVIS_JUDICE_NINKE.weight_sum(), 48, "JJN weights should sum to 48");
        assert_eq!(JARVIS_JUDICE_NINKE.divisor, 48);
    }

    #[test]
    fn test_offsets_point_forward() {
        for kernel in [FLOYD_STEINBERG, ATKINSON, STUCKI, JARVIS_JUDICE_NINKE] {
            for &(dx, dy, _) in kernel.entries {
                assert!(dy > 0 || (dy == 0 && dx > 0), "offset ({dx},{dy}) reaches a visited pixel");
            }
        }
    }

    #[test]
    fn test_pass_modes() {
        assert_eq!(FLOYD_STEINBERG.pass_mode, PassMode::Deferred);
        assert_eq!(ATKINSON.pass_mode, PassMode::Immediate);
        assert_eq!(STUCKI.pass_mode, PassMode::Deferred);
        assert_eq!(JARVIS_JUDICE_NINKE.pass_mode, PassMode::Deferred);
    }

    #[test]
    fn test_kernel_entry_count() {
        assert_eq!(FLOYD_STEINBERG.entries.len(), 4);
        assert_eq!(ATKINSON.entries.len(), 6);
        assert_eq!(STUCKI.entries.len(), 12);
        assert_eq!(JARVIS_JUDICE_NINKE.entries.len(), 12);
    }
}
