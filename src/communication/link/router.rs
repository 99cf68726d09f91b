//! Command Router
//!
//! Table-driven dispatch of inbound packages to handlers.
//!
//! The route table is a `&'static` slice built at compile time. Each route
//! names a command identifier, the addressing modes it accepts and a plain
//! function handler. Handlers receive the state they operate on by `&mut`, so
//! the caller decides which lock guards it.
//!
//! # Matching
//!
//! 1. The first route whose identifier equals the package's is chosen; later
//!    routes with the same identifier are never consulted.
//! 2. The handler runs if the route's flags intersect the package's flags.
//! 3. A package whose identifier matches no route is reported as unknown.

use bitflags::bitflags;

use super::codec::{CommandId, Package};
use crate::log_warn;

bitflags! {
    /// Addressing modes a route accepts
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MatchFlags: u8 {
        /// Sent to the broadcast address
        const BROADCAST = 0b00000001;
        /// Addressed to this node
        const FOR_ME = 0b00000010;
        /// Addressed to this node and not a broadcast
        const ONLY_FOR_ME = 0b00000100;
        /// Any of the above
        const ANY = Self::BROADCAST.bits() | Self::FOR_ME.bits() | Self::ONLY_FOR_ME.bits();
    }
}

impl MatchFlags {
    /// Addressing modes a received package satisfies
    ///
    /// Empty for a package addressed to some other node.
    pub fn from_package(package: &Package) -> Self {
        let mut flags = MatchFlags::empty();
        flags.set(MatchFlags::BROADCAST, package.is_broadcast);
        flags.set(MatchFlags::FOR_ME, package.is_for_me);
        flags.set(MatchFlags::ONLY_FOR_ME, package.is_only_for_me());
        flags
    }
}

/// Route handler
pub type Handler<S> = fn(&mut S, &Package);

/// One dispatch table entry
pub struct CommandRoute<S> {
    /// Command identifier this route answers
    pub command: CommandId,
    /// Accepted addressing modes
    pub flags: MatchFlags,
    /// Handler invoked on a match
    pub handler: Handler<S>,
}

impl<S> CommandRoute<S> {
    pub const fn new(command: CommandId, flags: MatchFlags, handler: Handler<S>) -> Self {
        Self {
            command,
            flags,
            handler,
        }
    }
}

/// Result of a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchOutcome {
    /// A route matched and its handler ran
    Handled,
    /// A route matched the identifier but not the addressing mode
    Ignored,
    /// No route for this identifier
    Unknown,
}

/// Command router over a static route table
pub struct CommandRouter<S: 'static> {
    routes: &'static [CommandRoute<S>],
}

impl<S> CommandRouter<S> {
    pub const fn new(routes: &'static [CommandRoute<S>]) -> Self {
        Self { routes }
    }

    /// Route table
    pub fn routes(&self) -> &'static [CommandRoute<S>] {
        self.routes
    }

    /// Dispatch `package` against the table
    pub fn dispatch(&self, state: &mut S, package: &Package) -> DispatchOutcome {
        let Some(route) = self.routes.iter().find(|r| r.command == package.command) else {
            log_warn!(
                "Unknown command {} from {}",
                package.command,
                package.source
            );
            return DispatchOutcome::Unknown;
        };

        if route.flags.intersects(MatchFlags::from_package(package)) {
            (route.handler)(state, package);
            DispatchOutcome::Handled
        } else {
            DispatchOutcome::Ignored
        }
    }
}
