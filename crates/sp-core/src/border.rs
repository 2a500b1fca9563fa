/// Border policy for convolution and stencil operators.
///
/// - `Skip`: output pixels within the kernel radius of an edge are left at
///   whatever value they had on entry; the caller owns the border.
/// - `Extend`: edge pixels are virtually replicated outward, so every output
///   pixel is computed.
/// - `Normalize`: like `Skip` in the interior; near the border the kernel is
///   re-summed over only the in-bounds taps and divided by that partial sum,
///   preserving unity gain at the edge. Only meaningful for kernels with a
///   non-zero sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvolveMode {
    Skip,
    Extend,
    Normalize,
}

/// Maps a possibly out-of-range coordinate onto `[0, len)` by edge
/// replication.
#[inline]
pub fn extend_index(i: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    if i < 0 { 0 } else { (i as usize).min(len - 1) }
}
