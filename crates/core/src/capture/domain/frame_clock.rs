/// Paces the capture loop, standing in for the display's refresh callback.
pub trait FrameClock {
    /// Waits for the next tick and returns a high-resolution timestamp in
    /// milliseconds. Timestamps strictly increase.
    fn next_tick(&mut self) -> f64;
}
