/*!
 * Object Iteration
 * ForEachObject over a snapshot of live IDs
 */

use super::Registry;
use crate::core::id::{ObjectId, ObjectType};
use serde::{Deserialize, Serialize};

/// Which creators an iteration visits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatorFilter {
    Any,
    Creator(ObjectId),
}

impl CreatorFilter {
    #[inline]
    fn matches(self, creator: ObjectId) -> bool {
        match self {
            CreatorFilter::Any => true,
            CreatorFilter::Creator(id) => id == creator,
        }
    }
}

impl From<ObjectId> for CreatorFilter {
    fn from(creator: ObjectId) -> Self {
        CreatorFilter::Creator(creator)
    }
}

impl From<Option<ObjectId>> for CreatorFilter {
    fn from(creator: Option<ObjectId>) -> Self {
        creator.map_or(CreatorFilter::Any, CreatorFilter::Creator)
    }
}

impl Registry {
    /// Active IDs of the given types matching `filter`, in type then index
    /// order
    ///
    /// Taken under the registry-wide lock so the view is consistent across
    /// tables.
    pub fn snapshot(&self, types: &[ObjectType], filter: CreatorFilter) -> Vec<ObjectId> {
        let _global = self.global.write();
        let mut ids = Vec::new();
        for &object_type in types {
            let Ok(table) = self.table(object_type) else {
                continue;
            };
            let state = table.state.lock();
            ids.extend(
                state
                    .records
                    .iter()
                    .filter(|r| filter.matches(r.creator))
                    .filter_map(|r| r.active_id()),
            );
        }
        ids
    }

    /// Invoke `callback` once per live object of any type
    ///
    /// No locks are held while the callback runs, so it may delete the
    /// object it is visiting (or any other). Objects deleted before their
    /// turn are skipped.
    pub fn for_each_object<F>(&self, filter: CreatorFilter, callback: F)
    where
        F: FnMut(ObjectId),
    {
        self.visit(&ObjectType::ALL, filter, callback);
    }

    /// Invoke `callback` once per live object of `object_type`
    pub fn for_each_object_of_type<F>(
        &self,
        object_type: ObjectType,
        filter: CreatorFilter,
        callback: F,
    ) where
        F: FnMut(ObjectId),
    {
        self.visit(&[object_type], filter, callback);
    }

    fn visit<F>(&self, types: &[ObjectType], filter: CreatorFilter, mut callback: F)
    where
        F: FnMut(ObjectId),
    {
        for id in self.snapshot(types, filter) {
            if self.is_active(id) {
                callback(id);
            }
        }
    }
}
