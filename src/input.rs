//! Pointer and button injection.

use anyhow::{Context, Result};
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Mouse, Settings};

use crate::geometry::{Bounds, ScreenBounds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

impl From<MouseButton> for Button {
    fn from(button: MouseButton) -> Self {
        match button {
            MouseButton::Left => Button::Left,
            MouseButton::Right => Button::Right,
        }
    }
}

/// Receiver of screen-space pointer commands.
///
/// Implementations accept calls at any rate; throttling belongs to the caller.
pub trait InputSink {
    /// Move the pointer to an absolute screen position.
    fn move_to(&mut self, x: i32, y: i32) -> Result<()>;

    fn click(&mut self, button: MouseButton) -> Result<()>;

    fn double_click(&mut self, button: MouseButton) -> Result<()>;

    /// Scroll vertically. Positive amounts scroll up, negative down.
    fn scroll(&mut self, amount: i32) -> Result<()>;
}

impl<S: InputSink + ?Sized> InputSink for Box<S> {
    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        (**self).move_to(x, y)
    }

    fn click(&mut self, button: MouseButton) -> Result<()> {
        (**self).click(button)
    }

    fn double_click(&mut self, button: MouseButton) -> Result<()> {
        (**self).double_click(button)
    }

    fn scroll(&mut self, amount: i32) -> Result<()> {
        (**self).scroll(amount)
    }
}

/// Injects real OS input events.
pub struct EnigoSink {
    enigo: Enigo,
}

impl EnigoSink {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default()).context("Failed to connect to input backend")?;
        Ok(Self { enigo })
    }

    /// Size of the main display, used as the screen-space bounds.
    pub fn screen_bounds(&self) -> Result<ScreenBounds> {
        let (width, height) = self
            .enigo
            .main_display()
            .context("Failed to query main display size")?;
        Ok(Bounds::new(width.into(), height.into())?)
    }
}

impl InputSink for EnigoSink {
    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        self.enigo.move_mouse(x, y, Coordinate::Abs)?;
        Ok(())
    }

    fn click(&mut self, button: MouseButton) -> Result<()> {
        self.enigo.button(button.into(), Direction::Click)?;
        Ok(())
    }

    fn double_click(&mut self, button: MouseButton) -> Result<()> {
        self.enigo.button(button.into(), Direction::Click)?;
        self.enigo.button(button.into(), Direction::Click)?;
        Ok(())
    }

    fn scroll(&mut self, amount: i32) -> Result<()> {
        // enigo scrolls down for positive lengths
        self.enigo.scroll(-amount, Axis::Vertical)?;
        Ok(())
    }
}

/// Logs commands instead of injecting them.
#[derive(Debug, Default)]
pub struct DryRunSink;

impl InputSink for DryRunSink {
    fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
        log::debug!("[dry-run] move to ({}, {})", x, y);
        Ok(())
    }

    fn click(&mut self, button: MouseButton) -> Result<()> {
        log::info!("[dry-run] click {:?}", button);
        Ok(())
    }

    fn double_click(&mut self, button: MouseButton) -> Result<()> {
        log::info!("[dry-run] double click {:?}", button);
        Ok(())
    }

    fn scroll(&mut self, amount: i32) -> Result<()> {
        log::info!("[dry-run] scroll {}", amount);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_accepts_every_command() {
        let mut sink: Box<dyn InputSink> = Box::new(DryRunSink);
        sink.move_to(960, 540).unwrap();
        sink.click(MouseButton::Left).unwrap();
        sink.double_click(MouseButton::Left).unwrap();
        sink.click(MouseButton::Right).unwrap();
        sink.scroll(-10).unwrap();
    }
}
