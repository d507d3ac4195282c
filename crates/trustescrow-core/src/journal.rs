// Copyright [2026] [Joseph Verdicchio]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 Joseph Verdicchio and TrustEscrow Contributors
// SPDX-License-Identifier: Apache-2.0

//! Undo journals behind the all-or-nothing calls of [`Chain`](crate::chain::Chain).
//!
//! Each stateful component records how to reverse every change it makes. A
//! successful call commits, which forgets the entries; a failed call rolls
//! back, which replays them newest first. The cost of either is proportional
//! to what the call touched, not to the size of the state.

/// State that can forget or reverse the changes made since its last commit.
pub trait Transactional {
    fn commit(&mut self);
    fn rollback(&mut self);
}

/// Undo entries recorded since the last commit.
#[derive(Debug, Clone)]
pub struct Journal<U> {
    entries: Vec<U>,
}

impl<U> Default for Journal<U> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<U> Journal<U> {
    pub fn record(&mut self, undo: U) {
        self.entries.push(undo);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Takes every entry, newest first, leaving the journal empty.
    pub fn unwind(&mut self) -> impl Iterator<Item = U> {
        std::mem::take(&mut self.entries).into_iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwind_runs_newest_first_and_empties() {
        let mut j = Journal::default();
        j.record(1);
        j.record(2);
        j.record(3);
        assert_eq!(j.unwind().collect::<Vec<_>>(), vec![3, 2, 1]);
        assert!(j.is_empty());
        j.record(4);
        j.clear();
        assert_eq!(j.len(), 0);
    }
}
