use std::collections::HashSet;
use std::sync::Arc;

use formats::Feature;
use foundation::Aabb2;
use parking_lot::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// A record of the batch cannot be stored; `offset` is its position in the batch.
    MalformedFeature {
        offset: usize,
        id: Option<String>,
        reason: String,
    },
    DuplicateId(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::MalformedFeature { offset, id, reason } => match id {
                Some(id) => write!(f, "malformed feature {id} (batch offset {offset}): {reason}"),
                None => write!(f, "malformed feature at batch offset {offset}: {reason}"),
            },
            SinkError::DuplicateId(id) => write!(f, "duplicate feature id: {id}"),
        }
    }
}

impl std::error::Error for SinkError {}

/// Destination of a progressive load.
///
/// `append_batch` is all-or-nothing: either every record of the batch becomes
/// visible to readers, or none does and an error is returned.
pub trait FeatureSink {
    fn append_batch(&mut self, batch: Vec<Feature>) -> Result<(), SinkError>;

    fn clear(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FeatureSink for Vec<Feature> {
    fn append_batch(&mut self, batch: Vec<Feature>) -> Result<(), SinkError> {
        self.extend(batch);
        Ok(())
    }

    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

#[derive(Debug, Default)]
struct SourceState {
    features: Vec<Feature>,
    ids: HashSet<String>,
    extent: Aabb2,
    revision: u64,
}

/// Shared, renderer-observed feature collection.
///
/// Clones are handles onto the same collection: the loader appends through one
/// handle while renderers read through others. Every append or clear bumps
/// [`VectorSource::revision`] once.
#[derive(Debug, Clone, Default)]
pub struct VectorSource {
    state: Arc<RwLock<SourceState>>,
}

impl VectorSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.state.read().revision
    }

    /// Bounds of every position stored so far (empty when nothing has geometry).
    pub fn extent(&self) -> Aabb2 {
        self.state.read().extent
    }

    pub fn get(&self, index: usize) -> Option<Feature> {
        self.state.read().features.get(index).cloned()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.state.read().ids.contains(id)
    }

    fn validate(state: &SourceState, batch: &[Feature]) -> Result<Aabb2, SinkError> {
        let mut batch_ids: HashSet<&str> = HashSet::new();
        let mut extent = Aabb2::empty();

        for (offset, feature) in batch.iter().enumerate() {
            if let Some(id) = feature.id.as_deref()
                && (state.ids.contains(id) || !batch_ids.insert(id))
            {
                return Err(SinkError::DuplicateId(id.to_string()));
            }

            if let Some(geometry) = &feature.geometry {
                let mut finite = true;
                geometry.for_each_position(&mut |p| {
                    if p[0].is_finite() && p[1].is_finite() {
                        extent.extend(p);
                    } else {
                        finite = false;
                    }
                });
                if !finite {
                    return Err(SinkError::MalformedFeature {
                        offset,
                        id: feature.id.clone(),
                        reason: format!("{} has non-finite coordinates", geometry.type_name()),
                    });
                }
            }
        }

        Ok(extent)
    }
}

impl FeatureSink for VectorSource {
    fn append_batch(&mut self, batch: Vec<Feature>) -> Result<(), SinkError> {
        let mut state = self.state.write();
        let batch_extent = Self::validate(&state, &batch)?;

        state.extent = state.extent.union(&batch_extent);
        for feature in &batch {
            if let Some(id) = &feature.id {
                state.ids.insert(id.clone());
            }
        }
        state.features.extend(batch);
        state.revision += 1;
        Ok(())
    }

    fn clear(&mut self) {
        let mut state = self.state.write();
        state.features.clear();
        state.ids.clear();
        state.extent = Aabb2::empty();
        state.revision += 1;
    }

    fn len(&self) -> usize {
        self.state.read().features.len()
    }
}
