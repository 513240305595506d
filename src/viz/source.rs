/// A frequency-magnitude producer, pulled once per processed tick.
///
/// Implementations must tolerate being called with no new audio and simply
/// return stale or silent data in that case.
pub trait FrequencySource {
    /// Number of magnitude bins the source produces.
    fn frequency_bin_count(&self) -> usize;

    /// Sample rate of the audio the spectrum was computed from.
    fn sample_rate(&self) -> f32;

    /// Fill `buffer` with the current spectrum, one byte (0-255) per bin.
    fn fill_byte_frequency_data(&mut self, buffer: &mut [u8]);
}
