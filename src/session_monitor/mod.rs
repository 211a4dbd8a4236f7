// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

//! Works out when a new weighing session begins so that the scale can be
//! re-zeroed automatically once per session.

pub mod session_monitoring;

pub use session_monitoring::{
    SessionConfig, SessionId, SessionMonitor, SessionState, SessionUpdate, SessionUpdates,
};
