//! Partitioning of a chunk sequence into LLM-sized groups.
//!
//! `group_size` is the number of groups requested. The number of chunks per
//! group is derived from it and checked against two quality thresholds: above
//! [`WARN_DOCS_PER_GROUP`] a warning is logged, above [`MAX_DOCS_PER_GROUP`]
//! the request is rejected.

use crate::{
    error::{DynamoError, Result},
    types::Chunk,
};

pub const MAX_DOCS_PER_GROUP: usize = 10;
pub const WARN_DOCS_PER_GROUP: usize = 5;

/// With no group size given, aim for this many chunks per group.
const DEFAULT_DOCS_PER_GROUP: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupQuality {
    Good,
    /// Groups are large enough that extraction quality likely suffers.
    Degraded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GroupPlan {
    pub group_size: usize,
    pub docs_per_group: usize,
    pub quality: GroupQuality,
}

impl GroupPlan {
    /// Number of groups the plan actually produces for `total` chunks. Can be
    /// less than `group_size` when the last window absorbs the remainder.
    pub fn group_count(&self, total: usize) -> usize {
        if self.docs_per_group == 0 {
            0
        } else {
            total.div_ceil(self.docs_per_group)
        }
    }
}

/// A contiguous run of chunks sent to the model as one request.
#[derive(Clone, Copy, Debug)]
pub struct Group<'a> {
    pub index: usize,
    pub chunks: &'a [Chunk],
}

impl Group<'_> {
    /// Chunk contents joined with no separator.
    pub fn text(&self) -> String {
        self.chunks.iter().map(|c| c.content.as_str()).collect()
    }
}

/// Validate `group_size` against `total` chunks and derive the chunk count per
/// group.
pub fn plan_groups(total: usize, group_size: usize) -> Result<GroupPlan> {
    if group_size > total {
        return Err(DynamoError::InvalidGroupSize {
            group_size,
            chunks: total,
        });
    }

    let group_size = if group_size == 0 {
        let derived = total / DEFAULT_DOCS_PER_GROUP;
        tracing::info!(
            group_size = derived,
            "No group size specified, targeting {DEFAULT_DOCS_PER_GROUP} chunks per group"
        );
        // Short transcripts still get a single group.
        if derived == 0 && total > 0 { 1 } else { derived }
    } else {
        group_size
    };

    if group_size == 0 {
        return Ok(GroupPlan {
            group_size: 0,
            docs_per_group: 0,
            quality: GroupQuality::Good,
        });
    }

    let docs_per_group = total.div_ceil(group_size);

    if docs_per_group > MAX_DOCS_PER_GROUP {
        return Err(DynamoError::GroupTooLarge {
            docs_per_group,
            group_size,
        });
    }

    let quality = if docs_per_group > WARN_DOCS_PER_GROUP {
        tracing::warn!(
            docs_per_group,
            group_size,
            "Each group has more than {WARN_DOCS_PER_GROUP} chunks, output quality is likely to be degraded; consider increasing the group size"
        );
        GroupQuality::Degraded
    } else {
        GroupQuality::Good
    };

    Ok(GroupPlan {
        group_size,
        docs_per_group,
        quality,
    })
}

/// Slice `chunks` into contiguous groups according to [`plan_groups`].
pub fn group(chunks: &[Chunk], group_size: usize) -> Result<Vec<Group<'_>>> {
    let plan = plan_groups(chunks.len(), group_size)?;
    Ok(split_by_plan(chunks, &plan))
}

pub fn split_by_plan<'a>(chunks: &'a [Chunk], plan: &GroupPlan) -> Vec<Group<'a>> {
    if plan.docs_per_group == 0 {
        return Vec::new();
    }
    chunks
        .chunks(plan.docs_per_group)
        .enumerate()
        .map(|(index, chunks)| Group { index, chunks })
        .collect()
}
