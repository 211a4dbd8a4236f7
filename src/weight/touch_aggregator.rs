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

use crate::weight::interface::{ContactFrame, ContactId, ContactPoint, MAX_CONTACTS};
use heapless::FnvIndexMap;
use log::{trace, warn};

/// Live table of contacts on the surface, rebuilt from every multitouch
/// snapshot and reduced to a single raw weight.
#[derive(Default)]
pub struct TouchAggregator {
    live: FnvIndexMap<ContactId, ContactPoint, MAX_CONTACTS>,
}

impl TouchAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one snapshot and returns the aggregate for it. A contact that
    /// is missing from the snapshot has been lifted and stops counting at
    /// once.
    pub fn process_frame(&mut self, frame: &ContactFrame) -> f32 {
        // Lifted contacts go first so the upserts below always have room.
        let lifted: heapless::Vec<ContactId, MAX_CONTACTS> = self
            .live
            .keys()
            .filter(|id| !frame.contacts.iter().any(|c| c.id == **id))
            .copied()
            .collect();
        for id in &lifted {
            self.live.remove(id);
        }

        for contact in &frame.contacts {
            if self.live.insert(contact.id, *contact).is_err() {
                warn!("Contact table full, ignoring contact {}", contact.id);
            }
        }

        let aggregate = self.aggregate();
        trace!(
            "{} live contacts, {} lifted, aggregate {}",
            self.live.len(),
            lifted.len(),
            aggregate
        );
        aggregate
    }

    /// Sum of the contributions of the touching contacts. Zero when the
    /// table is empty, and saturates at `f32::MAX` instead of overflowing.
    pub fn aggregate(&self) -> f32 {
        self.live
            .values()
            .map(ContactPoint::contribution)
            .fold(0.0, |sum, contribution| (sum + contribution).min(f32::MAX))
    }

    pub fn contact(&self, id: ContactId) -> Option<&ContactPoint> {
        self.live.get(&id)
    }

    pub fn live_contacts(&self) -> usize {
        self.live.len()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::interface::ContactState;

    fn contact(id: ContactId, pressure: f32, state: ContactState) -> ContactPoint {
        ContactPoint {
            id,
            pressure,
            density: 0.0,
            state,
            frame_timestamp: 0.0,
        }
    }

    fn frame(contacts: &[ContactPoint]) -> ContactFrame {
        ContactFrame {
            contacts: heapless::Vec::from_slice(contacts).unwrap(),
            timestamp: 0.0,
        }
    }

    #[test]
    fn lifted_contact_stops_counting_immediately() {
        let mut aggregator = TouchAggregator::new();
        let a = contact(1, 5.0, ContactState::Touching);
        let b = contact(2, 3.0, ContactState::Touching);

        assert_eq!(aggregator.process_frame(&frame(&[a, b])), 8.0);
        assert_eq!(aggregator.process_frame(&frame(&[a])), 5.0);
        assert_eq!(aggregator.live_contacts(), 1);
        assert!(aggregator.contact(2).is_none());
    }

    #[test]
    fn empty_frame_clears_the_table() {
        let mut aggregator = TouchAggregator::new();
        aggregator.process_frame(&frame(&[contact(1, 5.0, ContactState::Touching)]));
        assert_eq!(aggregator.process_frame(&frame(&[])), 0.0);
        assert_eq!(aggregator.live_contacts(), 0);
    }

    #[test]
    fn hovering_contacts_are_tracked_but_weigh_nothing() {
        let mut aggregator = TouchAggregator::new();
        let hover = contact(1, 9.0, ContactState::Hovering);
        let press = contact(2, 4.0, ContactState::Making);

        assert_eq!(aggregator.process_frame(&frame(&[hover, press])), 4.0);
        assert_eq!(aggregator.live_contacts(), 2);
    }

    #[test]
    fn snapshot_overwrites_previous_values() {
        let mut aggregator = TouchAggregator::new();
        aggregator.process_frame(&frame(&[contact(1, 5.0, ContactState::Touching)]));

        let mut heavier = contact(1, 2.0, ContactState::Breaking);
        heavier.density = 6.5;
        assert_eq!(aggregator.process_frame(&frame(&[heavier])), 6.5);
    }

    #[test]
    fn overflowing_sum_saturates() {
        let mut aggregator = TouchAggregator::new();
        let heavy = [
            contact(1, f32::MAX, ContactState::Touching),
            contact(2, f32::MAX, ContactState::Touching),
        ];
        assert_eq!(aggregator.process_frame(&frame(&heavy)), f32::MAX);
    }

    #[test]
    fn full_table_can_be_replaced_in_one_frame() {
        let mut aggregator = TouchAggregator::new();
        let first: Vec<ContactPoint> = (0..MAX_CONTACTS as i32)
            .map(|id| contact(id, 1.0, ContactState::Touching))
            .collect();
        let second: Vec<ContactPoint> = (100..100 + MAX_CONTACTS as i32)
            .map(|id| contact(id, 2.0, ContactState::Touching))
            .collect();

        assert_eq!(aggregator.process_frame(&frame(&first)), 16.0);
        assert_eq!(aggregator.process_frame(&frame(&second)), 32.0);
        assert!(aggregator.contact(0).is_none());
    }
}
