//! The engine context and the public operator entry points.
//!
//! One `Engine` owns one event table, one instance store, and one scheduler;
//! every id (events, sparsity maps, operators) is namespaced by the engine
//! instance. All operator entry points are deferred: they return pre-created
//! output handles plus a completion event, and the outputs' sparsity maps
//! become valid before that event triggers.

use std::hash::Hash;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use partwise_core::config::EngineConfig;
use partwise_core::digest::Digest;
use partwise_core::error::Result;
use partwise_core::id::{IdGen, SparsityId};
use partwise_core::point::{Coord, Point};
use partwise_core::rect::Rect;
use partwise_event::{EventId, EventTable};
use partwise_field::{FieldDataDescriptor, FieldValue, HeapInstances};
use partwise_ops::{
    ByFieldOperator, EqualSplitOperator, FoldSetOperator, ImageOperator, PairwiseSetOperator,
    PartitionOperator, PreimageOperator, SetOpKind, WeightedSplitOperator,
};
use partwise_space::sparsity::SparsityMap;
use partwise_space::IndexSpace;

use crate::metrics::{SchedulerStats, StatsSnapshot};
use crate::scheduler::Scheduler;

pub struct Engine {
    config: EngineConfig,
    events: Arc<EventTable>,
    instances: Arc<HeapInstances>,
    sparsity_ids: Arc<IdGen>,
    scheduler: Scheduler,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let events = Arc::new(EventTable::new(config.node_id));
        let instances = Arc::new(HeapInstances::new());
        let sparsity_ids = Arc::new(IdGen::new());
        let (scheduler, shared) = Scheduler::start(
            config.clone(),
            Arc::clone(&events),
            Arc::clone(&instances),
            Arc::clone(&sparsity_ids),
        );
        events.set_sink(shared);
        Engine {
            config,
            events,
            instances,
            sparsity_ids,
            scheduler,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn events(&self) -> &EventTable {
        &self.events
    }

    pub fn instances(&self) -> &HeapInstances {
        &self.instances
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.scheduler.stats().snapshot()
    }

    /// Stop dequeuing, poison all pending operators, and join the workers.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    // ---- event helpers (thin passthroughs for top-level code) ----

    pub fn create_user_event(&self) -> EventId {
        self.events.create_event()
    }

    pub fn trigger_event(&self, e: EventId) {
        self.events.trigger(e);
    }

    pub fn poison_event(&self, e: EventId) {
        self.events.trigger_poisoned(e);
    }

    pub fn merge_events(&self, es: &[EventId]) -> EventId {
        self.events.merge(es)
    }

    pub fn wait(&self, e: EventId) -> Result<()> {
        self.events.wait(e)
    }

    // ---- partition operators ----

    /// Split `space`'s points in scan order into `count` pieces of
    /// near-equal size (within one granularity unit).
    pub fn create_equal_subspaces<const N: usize, T: Coord>(
        &self,
        space: &IndexSpace<N, T>,
        count: usize,
        granularity: u64,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId) {
        let digest = self.request_digest(precondition, json!({
            "kind": "equal_subspaces",
            "space": space_key(space),
            "count": count,
            "granularity": granularity,
        }));
        if let Some(hit) = self.dedup_hit(&digest) {
            return hit;
        }
        let outputs = self.alloc_outputs(space.bounds, count);
        let pres = vec![precondition, space.validity_event()];
        let completion = self.finish_submit(
            Box::new(EqualSplitOperator {
                space: space.clone(),
                granularity,
                outputs: outputs.clone(),
            }),
            pres,
            digest,
            &outputs,
        );
        (outputs, completion)
    }

    /// Split `space`'s points in scan order into pieces proportional to
    /// `weights` (one output per weight).
    pub fn create_weighted_subspaces<const N: usize, T: Coord>(
        &self,
        space: &IndexSpace<N, T>,
        granularity: u64,
        weights: &[u64],
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId) {
        let digest = self.request_digest(precondition, json!({
            "kind": "weighted_subspaces",
            "space": space_key(space),
            "granularity": granularity,
            "weights": weights,
        }));
        if let Some(hit) = self.dedup_hit(&digest) {
            return hit;
        }
        let outputs = self.alloc_outputs(space.bounds, weights.len());
        let pres = vec![precondition, space.validity_event()];
        let completion = self.finish_submit(
            Box::new(WeightedSplitOperator {
                space: space.clone(),
                granularity,
                weights: weights.to_vec(),
                outputs: outputs.clone(),
            }),
            pres,
            digest,
            &outputs,
        );
        (outputs, completion)
    }

    /// One output per color: the points of `parent` whose field value equals
    /// that color. Unrequested colors are silently dropped.
    pub fn create_subspaces_by_field<const N: usize, T, C>(
        &self,
        parent: &IndexSpace<N, T>,
        field_data: Vec<FieldDataDescriptor<N, T, C>>,
        colors: Vec<C>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId)
    where
        T: Coord,
        C: FieldValue + Eq + Hash + Serialize,
    {
        let digest = self.request_digest(precondition, json!({
            "kind": "subspaces_by_field",
            "parent": space_key(parent),
            "field_data": field_data.iter().map(desc_key).collect::<Vec<_>>(),
            "colors": &colors,
        }));
        if let Some(hit) = self.dedup_hit(&digest) {
            return hit;
        }
        let outputs = self.alloc_outputs(parent.bounds, colors.len());
        let mut pres = vec![precondition, parent.validity_event()];
        pres.extend(field_data.iter().map(|d| d.index_space.validity_event()));
        let completion = self.finish_submit(
            Box::new(ByFieldOperator {
                parent: parent.clone(),
                field_data,
                colors,
                outputs: outputs.clone(),
            }),
            pres,
            digest,
            &outputs,
        );
        (outputs, completion)
    }

    /// One output per source: the field values of the source's points,
    /// clipped to `codomain`.
    pub fn create_subspaces_by_image<const N: usize, T, const M: usize, S>(
        &self,
        codomain: &IndexSpace<M, S>,
        field_data: Vec<FieldDataDescriptor<N, T, Point<M, S>>>,
        sources: Vec<IndexSpace<N, T>>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<M, S>>, EventId)
    where
        T: Coord,
        S: Coord + FieldValue,
    {
        let digest = self.request_digest(precondition, json!({
            "kind": "subspaces_by_image",
            "codomain": space_key(codomain),
            "field_data": field_data.iter().map(desc_key).collect::<Vec<_>>(),
            "sources": sources.iter().map(space_key).collect::<Vec<_>>(),
        }));
        if let Some(hit) = self.dedup_hit(&digest) {
            return hit;
        }
        let outputs = self.alloc_outputs(codomain.bounds, sources.len());
        let mut pres = vec![precondition, codomain.validity_event()];
        pres.extend(field_data.iter().map(|d| d.index_space.validity_event()));
        pres.extend(sources.iter().map(|s| s.validity_event()));
        let completion = self.finish_submit(
            Box::new(ImageOperator {
                codomain: codomain.clone(),
                field_data,
                sources,
                outputs: outputs.clone(),
            }),
            pres,
            digest,
            &outputs,
        );
        (outputs, completion)
    }

    /// One output per target: the points of `parent` whose field value lands
    /// in that target. Overlapping targets yield overlapping outputs.
    pub fn create_subspaces_by_preimage<const N: usize, T, const M: usize, S>(
        &self,
        parent: &IndexSpace<N, T>,
        field_data: Vec<FieldDataDescriptor<N, T, Point<M, S>>>,
        targets: Vec<IndexSpace<M, S>>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId)
    where
        T: Coord,
        S: Coord + FieldValue,
    {
        let digest = self.request_digest(precondition, json!({
            "kind": "subspaces_by_preimage",
            "parent": space_key(parent),
            "field_data": field_data.iter().map(desc_key).collect::<Vec<_>>(),
            "targets": targets.iter().map(space_key).collect::<Vec<_>>(),
        }));
        if let Some(hit) = self.dedup_hit(&digest) {
            return hit;
        }
        let outputs = self.alloc_outputs(parent.bounds, targets.len());
        let mut pres = vec![precondition, parent.validity_event()];
        pres.extend(field_data.iter().map(|d| d.index_space.validity_event()));
        pres.extend(targets.iter().map(|t| t.validity_event()));
        let completion = self.finish_submit(
            Box::new(PreimageOperator {
                parent: parent.clone(),
                field_data,
                targets,
                outputs: outputs.clone(),
            }),
            pres,
            digest,
            &outputs,
        );
        (outputs, completion)
    }

    // ---- set-algebra batch forms ----

    /// Single output: the union of all of `xs`.
    pub fn compute_union<const N: usize, T: Coord>(
        &self,
        xs: &[IndexSpace<N, T>],
        precondition: EventId,
    ) -> (IndexSpace<N, T>, EventId) {
        let bounds = xs
            .iter()
            .fold(Rect::empty(), |acc, x| acc.bounding_union(&x.bounds));
        self.fold_op(SetOpKind::Union, xs, bounds, precondition)
    }

    /// Single output: the intersection of all of `xs`.
    pub fn compute_intersection<const N: usize, T: Coord>(
        &self,
        xs: &[IndexSpace<N, T>],
        precondition: EventId,
    ) -> (IndexSpace<N, T>, EventId) {
        let bounds = match xs.split_first() {
            Some((first, rest)) => rest
                .iter()
                .fold(first.bounds, |acc, x| acc.intersection(&x.bounds)),
            None => Rect::empty(),
        };
        self.fold_op(SetOpKind::Intersection, xs, bounds, precondition)
    }

    /// Single output: the points of `a` not in `b`.
    pub fn compute_difference<const N: usize, T: Coord>(
        &self,
        a: &IndexSpace<N, T>,
        b: &IndexSpace<N, T>,
        precondition: EventId,
    ) -> (IndexSpace<N, T>, EventId) {
        self.fold_op(
            SetOpKind::Difference,
            &[a.clone(), b.clone()],
            a.bounds,
            precondition,
        )
    }

    /// `outputs[i] = lhs[i] ∪ rhs[i]` (broadcast when `rhs` has one space).
    pub fn compute_unions<const N: usize, T: Coord>(
        &self,
        lhs: &[IndexSpace<N, T>],
        rhs: &[IndexSpace<N, T>],
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId) {
        self.pairwise_op(SetOpKind::Union, lhs, rhs, precondition)
    }

    /// `outputs[i] = lhs[i] ∩ rhs[i]` (broadcast when `rhs` has one space).
    pub fn compute_intersections<const N: usize, T: Coord>(
        &self,
        lhs: &[IndexSpace<N, T>],
        rhs: &[IndexSpace<N, T>],
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId) {
        self.pairwise_op(SetOpKind::Intersection, lhs, rhs, precondition)
    }

    /// `outputs[i] = lhs[i] \ rhs[i]` (broadcast when `rhs` has one space).
    pub fn compute_differences<const N: usize, T: Coord>(
        &self,
        lhs: &[IndexSpace<N, T>],
        rhs: &[IndexSpace<N, T>],
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId) {
        self.pairwise_op(SetOpKind::Difference, lhs, rhs, precondition)
    }

    fn fold_op<const N: usize, T: Coord>(
        &self,
        kind: SetOpKind,
        inputs: &[IndexSpace<N, T>],
        bounds: Rect<N, T>,
        precondition: EventId,
    ) -> (IndexSpace<N, T>, EventId) {
        let digest = self.request_digest(precondition, json!({
            "kind": format!("fold_{kind:?}"),
            "inputs": inputs.iter().map(space_key).collect::<Vec<_>>(),
        }));
        if let Some(hit) = self.dedup_hit(&digest) {
            return hit;
        }
        let output = self.alloc_output(bounds);
        let mut pres = vec![precondition];
        pres.extend(inputs.iter().map(|x| x.validity_event()));
        let completion = self.finish_submit(
            Box::new(FoldSetOperator {
                kind,
                inputs: inputs.to_vec(),
                output: output.clone(),
            }),
            pres,
            digest,
            &output,
        );
        (output, completion)
    }

    fn pairwise_op<const N: usize, T: Coord>(
        &self,
        kind: SetOpKind,
        lhs: &[IndexSpace<N, T>],
        rhs: &[IndexSpace<N, T>],
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId) {
        let digest = self.request_digest(precondition, json!({
            "kind": format!("pairwise_{kind:?}"),
            "lhs": lhs.iter().map(space_key).collect::<Vec<_>>(),
            "rhs": rhs.iter().map(space_key).collect::<Vec<_>>(),
        }));
        if let Some(hit) = self.dedup_hit(&digest) {
            return hit;
        }
        let outputs: Vec<IndexSpace<N, T>> = lhs
            .iter()
            .enumerate()
            .map(|(i, a)| {
                // A malformed rhs length is caught by the operator, which
                // poisons these outputs; fall back to the lhs bounds here.
                let b = if rhs.len() == 1 { rhs.first() } else { rhs.get(i) };
                let bounds = match (kind, b) {
                    (SetOpKind::Union, Some(b)) => a.bounds.bounding_union(&b.bounds),
                    (SetOpKind::Intersection, Some(b)) => a.bounds.intersection(&b.bounds),
                    _ => a.bounds,
                };
                self.alloc_output(bounds)
            })
            .collect();
        let mut pres = vec![precondition];
        pres.extend(lhs.iter().map(|x| x.validity_event()));
        pres.extend(rhs.iter().map(|x| x.validity_event()));
        let completion = self.finish_submit(
            Box::new(PairwiseSetOperator {
                kind,
                lhs: lhs.to_vec(),
                rhs: rhs.to_vec(),
                outputs: outputs.clone(),
            }),
            pres,
            digest,
            &outputs,
        );
        (outputs, completion)
    }

    // ---- internals ----

    fn alloc_sparsity_id(&self) -> SparsityId {
        SparsityId::new(self.sparsity_ids.next_raw())
    }

    /// A fresh output space: caller-visible immediately, pending until its
    /// producing operator finalizes it. The handle is never reused for
    /// another request.
    fn alloc_output<const N: usize, T: Coord>(&self, bounds: Rect<N, T>) -> IndexSpace<N, T> {
        let validity = self.events.create_event();
        IndexSpace::sparse(bounds, SparsityMap::pending(self.alloc_sparsity_id(), validity))
    }

    fn alloc_outputs<const N: usize, T: Coord>(
        &self,
        bounds: Rect<N, T>,
        count: usize,
    ) -> Vec<IndexSpace<N, T>> {
        (0..count).map(|_| self.alloc_output(bounds)).collect()
    }

    /// Dedup identity: request kind + inputs + params + precondition. Two
    /// requests gated by different preconditions never share outputs, so a
    /// poisoned gate cannot leak across callers.
    fn request_digest(
        &self,
        precondition: EventId,
        key: serde_json::Value,
    ) -> Option<Digest> {
        if !self.config.dedup {
            return None;
        }
        Digest::of(&json!({ "pre": precondition.raw(), "req": key })).ok()
    }

    fn dedup_hit<R: Clone + 'static>(&self, digest: &Option<Digest>) -> Option<(R, EventId)> {
        let d = digest.as_ref()?;
        let (completion, outputs) = self.scheduler.dedup().lookup::<R>(d)?;
        SchedulerStats::bump(&self.scheduler.stats().deduped);
        Some((outputs, completion))
    }

    fn finish_submit<R: Clone + Send + Sync + 'static>(
        &self,
        op: Box<dyn PartitionOperator>,
        preconditions: Vec<EventId>,
        digest: Option<Digest>,
        outputs: &R,
    ) -> EventId {
        let completion = self.events.create_event();
        if let Some(d) = &digest {
            self.scheduler.dedup().insert(*d, completion, outputs.clone());
        }
        let pre = self.events.merge(&preconditions);
        self.scheduler.submit(op, pre, completion, digest);
        if self.config.serialize_operators {
            // Stage-by-stage debugging mode; poison shows up at the caller's
            // own wait.
            let _ = self.events.wait(completion);
        }
        completion
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new(EngineConfig::default())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The space-centric mirror of the operator entry points.
pub trait PartitionableSpace<const N: usize, T: Coord> {
    fn create_equal_subspaces(
        &self,
        engine: &Engine,
        count: usize,
        granularity: u64,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId);

    fn create_weighted_subspaces(
        &self,
        engine: &Engine,
        granularity: u64,
        weights: &[u64],
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId);

    fn create_subspaces_by_field<C>(
        &self,
        engine: &Engine,
        field_data: Vec<FieldDataDescriptor<N, T, C>>,
        colors: Vec<C>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId)
    where
        C: FieldValue + Eq + Hash + Serialize;

    fn create_subspaces_by_image<const M: usize, S>(
        &self,
        engine: &Engine,
        field_data: Vec<FieldDataDescriptor<M, S, Point<N, T>>>,
        sources: Vec<IndexSpace<M, S>>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId)
    where
        S: Coord,
        T: FieldValue;

    fn create_subspaces_by_preimage<const M: usize, S>(
        &self,
        engine: &Engine,
        field_data: Vec<FieldDataDescriptor<N, T, Point<M, S>>>,
        targets: Vec<IndexSpace<M, S>>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId)
    where
        S: Coord + FieldValue;
}

impl<const N: usize, T: Coord> PartitionableSpace<N, T> for IndexSpace<N, T> {
    fn create_equal_subspaces(
        &self,
        engine: &Engine,
        count: usize,
        granularity: u64,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId) {
        engine.create_equal_subspaces(self, count, granularity, precondition)
    }

    fn create_weighted_subspaces(
        &self,
        engine: &Engine,
        granularity: u64,
        weights: &[u64],
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId) {
        engine.create_weighted_subspaces(self, granularity, weights, precondition)
    }

    fn create_subspaces_by_field<C>(
        &self,
        engine: &Engine,
        field_data: Vec<FieldDataDescriptor<N, T, C>>,
        colors: Vec<C>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId)
    where
        C: FieldValue + Eq + Hash + Serialize,
    {
        engine.create_subspaces_by_field(self, field_data, colors, precondition)
    }

    fn create_subspaces_by_image<const M: usize, S>(
        &self,
        engine: &Engine,
        field_data: Vec<FieldDataDescriptor<M, S, Point<N, T>>>,
        sources: Vec<IndexSpace<M, S>>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId)
    where
        S: Coord,
        T: FieldValue,
    {
        engine.create_subspaces_by_image(self, field_data, sources, precondition)
    }

    fn create_subspaces_by_preimage<const M: usize, S>(
        &self,
        engine: &Engine,
        field_data: Vec<FieldDataDescriptor<N, T, Point<M, S>>>,
        targets: Vec<IndexSpace<M, S>>,
        precondition: EventId,
    ) -> (Vec<IndexSpace<N, T>>, EventId)
    where
        S: Coord + FieldValue,
    {
        engine.create_subspaces_by_preimage(self, field_data, targets, precondition)
    }
}

fn space_key<const N: usize, T: Coord>(s: &IndexSpace<N, T>) -> serde_json::Value {
    json!({
        "lo": s.bounds.lo.0.iter().map(|c| c.to_i64()).collect::<Vec<_>>(),
        "hi": s.bounds.hi.0.iter().map(|c| c.to_i64()).collect::<Vec<_>>(),
        "sparsity": s.sparsity.as_ref().map(|m| m.id().raw()),
    })
}

fn desc_key<const N: usize, T: Coord, V>(d: &FieldDataDescriptor<N, T, V>) -> serde_json::Value {
    json!({
        "space": space_key(&d.index_space),
        "instance": d.instance.raw(),
        "field_offset": d.field_offset,
    })
}
