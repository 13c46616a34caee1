//! Fixed per-frame pass order.

/// One stage of the deferred frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    Shadow,
    Geometry,
    DirectionalLighting,
    PointLighting,
    Composite,
}

impl PassKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Shadow => "shadow_pass",
            Self::Geometry => "geometry_pass",
            Self::DirectionalLighting => "directional_lighting_pass",
            Self::PointLighting => "point_lighting_pass",
            Self::Composite => "composite_pass",
        }
    }
}

/// Every frame runs exactly these passes, in this order.
pub const FRAME_ORDER: [PassKind; 5] = [
    PassKind::Shadow,
    PassKind::Geometry,
    PassKind::DirectionalLighting,
    PassKind::PointLighting,
    PassKind::Composite,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    OutOfOrder { expected: Option<PassKind>, got: PassKind },
    Incomplete { next: PassKind },
    /// A frame is being recorded; resources cannot change.
    Busy,
}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfOrder { expected: Some(expected), got } => write!(
                f,
                "Pass '{}' entered out of order, expected '{}'",
                got.label(),
                expected.label()
            ),
            Self::OutOfOrder { expected: None, got } => {
                write!(f, "Pass '{}' entered after the frame completed", got.label())
            }
            Self::Incomplete { next } => {
                write!(f, "Frame finished before pass '{}' ran", next.label())
            }
            Self::Busy => write!(f, "Frame in flight"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Tracks progress through [`FRAME_ORDER`] for one frame at a time.
#[derive(Debug, Default)]
pub struct FrameSchedule {
    /// `Some(n)` while recording: `n` passes have been entered.
    cursor: Option<usize>,
    frames_completed: u64,
}

impl FrameSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.cursor.is_none()
    }

    pub fn frames_completed(&self) -> u64 {
        self.frames_completed
    }

    pub fn begin(&mut self) -> Result<(), FrameError> {
        if self.cursor.is_some() {
            return Err(FrameError::Busy);
        }
        self.cursor = Some(0);
        Ok(())
    }

    /// Mark `pass` as the next pass to run. Fails unless it is the next
    /// entry of [`FRAME_ORDER`].
    pub fn enter(&mut self, pass: PassKind) -> Result<(), FrameError> {
        let cursor = match self.cursor {
            Some(cursor) => cursor,
            None => {
                return Err(FrameError::OutOfOrder {
                    expected: None,
                    got: pass,
                })
            }
        };
        let expected = FRAME_ORDER.get(cursor).copied();
        if expected != Some(pass) {
            return Err(FrameError::OutOfOrder { expected, got: pass });
        }
        self.cursor = Some(cursor + 1);
        Ok(())
    }

    pub fn finish(&mut self) -> Result<(), FrameError> {
        match self.cursor {
            Some(cursor) if cursor == FRAME_ORDER.len() => {
                self.cursor = None;
                self.frames_completed += 1;
                Ok(())
            }
            Some(cursor) => Err(FrameError::Incomplete {
                next: FRAME_ORDER[cursor],
            }),
            None => Err(FrameError::OutOfOrder {
                expected: Some(FRAME_ORDER[0]),
                got: FRAME_ORDER[FRAME_ORDER.len() - 1],
            }),
        }
    }

    /// Drop a partially recorded frame (e.g. after a failed surface acquire).
    pub fn abort(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            tracing::debug!("Aborted frame after {} of {} passes", cursor, FRAME_ORDER.len());
        }
    }
}
