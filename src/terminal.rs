//! terminal mode management.
//!
//! while the dashboard runs, the terminal is in raw mode on the alternate screen, with the cursor
//! hidden. [`RawMode`] puts it back the way it was, however the dashboard exits.

use {
    crossterm::{cursor, execute, terminal},
    std::{
        io::{self, Write},
        sync::Once,
    },
    tracing::{debug, warn},
};

/// a terminal whose input mode can be switched.
pub trait Terminal {
    /// enters raw mode, switches to the alternate screen, and hides the cursor.
    fn enter(&mut self) -> io::Result<()>;

    /// undoes everything [`Terminal::enter()`] did.
    fn restore(&mut self) -> io::Result<()>;
}

/// the real terminal, driven through `crossterm`.
#[derive(Debug, Default)]
pub struct Crossterm;

/// holds a [`Terminal`] in raw mode, restoring it when dropped.
pub struct RawMode<T: Terminal> {
    terminal: T,
    active: bool,
}

// === impl Crossterm ===

impl Crossterm {
    /// restores the terminal before a panic message is printed, so that it is legible.
    fn restore_on_panic() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let original = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                let _ = Self::leave(&mut io::stdout());
                original(info);
            }));
        });
    }

    fn leave(out: &mut impl Write) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(out, terminal::LeaveAlternateScreen, cursor::Show)
    }
}

impl Terminal for Crossterm {
    fn enter(&mut self) -> io::Result<()> {
        Self::restore_on_panic();
        terminal::enable_raw_mode()?;

        let mut out = io::stdout();
        if let Err(error) = execute!(
            out,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All)
        ) {
            let _ = Self::leave(&mut out);
            return Err(error);
        }

        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        Self::leave(&mut io::stdout())
    }
}

impl<T: Terminal + ?Sized> Terminal for &mut T {
    fn enter(&mut self) -> io::Result<()> {
        (**self).enter()
    }

    fn restore(&mut self) -> io::Result<()> {
        (**self).restore()
    }
}

// === impl RawMode ===

impl<T: Terminal> RawMode<T> {
    /// switches `terminal` into raw mode.
    pub fn enter(mut terminal: T) -> io::Result<Self> {
        terminal.enter()?;
        debug!("entered raw mode");
        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// restores the terminal now, reporting any failure.
    pub fn restore(mut self) -> io::Result<()> {
        self.restore_now()
    }

    fn restore_now(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        self.terminal.restore()?;
        debug!("restored terminal");
        Ok(())
    }
}

impl<T: Terminal> Drop for RawMode<T> {
    fn drop(&mut self) {
        if let Err(error) = self.restore_now() {
            warn!(%error, "could not restore terminal");
        }
    }
}

#[cfg(test)]
pub use self::mock::*;

#[cfg(test)]
mod mock {
    use {
        super::*,
        std::{cell::RefCell, rc::Rc},
    };

    /// the observable modes of a terminal.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub struct Attrs {
        pub raw: bool,
        pub alternate: bool,
        pub cursor_hidden: bool,
    }

    /// a terminal that records what was done to it.
    ///
    /// clones share state, so a test can keep one and hand the other away.
    #[derive(Clone, Debug, Default)]
    pub struct MockTerminal {
        state: Rc<RefCell<MockState>>,
    }

    #[derive(Debug, Default)]
    struct MockState {
        attrs: Attrs,
        entered: usize,
        fail: bool,
    }

    impl MockTerminal {
        pub fn new() -> Self {
            Self::default()
        }

        /// a terminal that cannot be put into raw mode.
        pub fn failing() -> Self {
            let terminal = Self::default();
            terminal.state.borrow_mut().fail = true;
            terminal
        }

        pub fn attrs(&self) -> Attrs {
            self.state.borrow().attrs
        }

        /// whether raw mode was ever requested.
        pub fn touched(&self) -> bool {
            self.state.borrow().entered > 0
        }
    }

    impl Terminal for MockTerminal {
        fn enter(&mut self) -> io::Result<()> {
            let mut state = self.state.borrow_mut();
            state.entered += 1;
            if state.fail {
                return Err(io::Error::other("not a tty"));
            }
            state.attrs = Attrs {
                raw: true,
                alternate: true,
                cursor_hidden: true,
            };
            Ok(())
        }

        fn restore(&mut self) -> io::Result<()> {
            self.state.borrow_mut().attrs = Attrs::default();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_on_drop() {
        let terminal = MockTerminal::new();
        let before = terminal.attrs();
        {
            let _guard = RawMode::enter(terminal.clone()).unwrap();
            assert!(terminal.attrs().raw);
            assert!(terminal.attrs().cursor_hidden);
        }
        assert_eq!(terminal.attrs(), before);
    }

    #[test]
    fn restores_explicitly() {
        let terminal = MockTerminal::new();
        let guard = RawMode::enter(terminal.clone()).unwrap();
        guard.restore().unwrap();
        assert_eq!(terminal.attrs(), Attrs::default());
    }

    #[test]
    fn restores_during_unwinding() {
        let terminal = MockTerminal::new();
        let inner = terminal.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _guard = RawMode::enter(inner).unwrap();
            panic!("renderer exploded");
        }));
        assert!(result.is_err());
        assert_eq!(terminal.attrs(), Attrs::default());
    }

    #[test]
    fn failure_to_enter_is_reported() {
        let terminal = MockTerminal::failing();
        assert!(RawMode::enter(terminal.clone()).is_err());
        assert_eq!(terminal.attrs(), Attrs::default());
    }
}
