//! One trigger bound to one anchor.

use std::time::Instant;

use tracing::warn;
use trellis_anchor::{ImageIdentity, PlacementSlotId, Pose};
use trellis_catalog::{LayerId, Poi, TriggerId, TriggerObject};
use trellis_sink::{ContentHandle, DefinitionHandle, OutputSink, SinkError};

/// The anchor a visualizer is attached to.
#[derive(Debug, Clone, PartialEq)]
pub enum AnchorBinding {
    /// Follows a tracked reference image.
    Image { identity: ImageIdentity, pose: Pose },
    /// Fixed where a tap hit a plane.
    Placement { slot: PlacementSlotId, pose: Pose },
}

impl AnchorBinding {
    pub fn pose(&self) -> &Pose {
        match self {
            AnchorBinding::Image { pose, .. } | AnchorBinding::Placement { pose, .. } => pose,
        }
    }
}

/// Runtime binding of a trigger object to an anchor and its content.
///
/// Content is created lazily and at most once. After that the visualizer
/// only toggles its active flag, moves it, or destroys it.
#[derive(Debug, Clone)]
pub struct Visualizer {
    trigger: TriggerId,
    poi: Poi,
    layer: LayerId,
    binding: AnchorBinding,
    content: Option<ContentHandle>,
    created: bool,
    first_placement_done: bool,
    active: bool,
    activation_time: Instant,
    last_update_time: Instant,
}

impl Visualizer {
    fn new(trigger: &TriggerObject, poi: &Poi, binding: AnchorBinding, now: Instant) -> Self {
        Self {
            trigger: trigger.id.clone(),
            poi: poi.clone(),
            layer: trigger.layer.clone(),
            binding,
            content: None,
            created: false,
            first_placement_done: false,
            active: false,
            activation_time: now,
            last_update_time: now,
        }
    }

    pub fn for_image(
        trigger: &TriggerObject,
        poi: &Poi,
        identity: ImageIdentity,
        pose: Pose,
        now: Instant,
    ) -> Self {
        Self::new(trigger, poi, AnchorBinding::Image { identity, pose }, now)
    }

    pub fn for_placement(
        trigger: &TriggerObject,
        poi: &Poi,
        slot: PlacementSlotId,
        pose: Pose,
        now: Instant,
    ) -> Self {
        Self::new(trigger, poi, AnchorBinding::Placement { slot, pose }, now)
    }

    pub fn trigger(&self) -> &TriggerId {
        &self.trigger
    }

    pub fn poi(&self) -> &Poi {
        &self.poi
    }

    /// Layer of the trigger at the time the visualizer was bound.
    pub fn layer(&self) -> &LayerId {
        &self.layer
    }

    pub fn binding(&self) -> &AnchorBinding {
        &self.binding
    }

    pub fn content(&self) -> Option<ContentHandle> {
        self.content
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn first_placement_done(&self) -> bool {
        self.first_placement_done
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn activation_time(&self) -> Instant {
        self.activation_time
    }

    pub fn last_update_time(&self) -> Instant {
        self.last_update_time
    }

    pub fn definition(&self) -> DefinitionHandle {
        DefinitionHandle::new(self.trigger.clone(), self.poi.id.clone())
    }

    /// Record an update at `now`. Never moves the timestamp backwards.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_update_time {
            self.last_update_time = now;
        }
    }

    /// True once the POI timeout has fully elapsed since the last update.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.poi.tracking_timeout() {
            Some(timeout) => now >= self.last_update_time + timeout,
            None => false,
        }
    }

    /// Create the content unless it already exists.
    ///
    /// Once a handle exists it is returned as is. A failed creation leaves
    /// the visualizer without content, so a later call tries again.
    pub fn ensure_content(&mut self, sink: &dyn OutputSink) -> Result<Option<ContentHandle>, SinkError> {
        if self.created {
            return Ok(self.content);
        }
        let handle = sink.create(&self.definition(), self.binding.pose())?;
        self.created = true;
        self.content = Some(handle);
        self.first_placement_done = true;
        Ok(Some(handle))
    }

    /// Show the content. Returns true if the flag changed.
    pub fn activate(&mut self, sink: &dyn OutputSink, now: Instant) -> bool {
        let Some(handle) = self.content else {
            return false;
        };
        if self.active {
            return false;
        }
        if let Err(e) = sink.set_active(handle, true) {
            warn!(trigger = %self.trigger, error = %e, "Failed to activate content");
            return false;
        }
        self.active = true;
        self.activation_time = now;
        true
    }

    /// Hide the content. Returns true if the flag changed.
    pub fn deactivate(&mut self, sink: &dyn OutputSink) -> bool {
        let Some(handle) = self.content else {
            return false;
        };
        if !self.active {
            return false;
        }
        if let Err(e) = sink.set_active(handle, false) {
            warn!(trigger = %self.trigger, error = %e, "Failed to deactivate content");
        }
        self.active = false;
        true
    }

    /// Follow a new image pose. Placements keep the pose of their first placement.
    pub fn update_pose(&mut self, sink: &dyn OutputSink, new_pose: Pose) {
        let AnchorBinding::Image { pose, .. } = &mut self.binding else {
            return;
        };
        *pose = new_pose;
        if let (Some(handle), true) = (self.content, self.first_placement_done) {
            if let Err(e) = sink.set_pose(handle, &new_pose) {
                warn!(trigger = %self.trigger, error = %e, "Failed to move content");
            }
        }
    }

    /// Release the content.
    pub fn destroy(self, sink: &dyn OutputSink) {
        if let Some(handle) = self.content {
            if let Err(e) = sink.destroy(handle) {
                warn!(trigger = %self.trigger, error = %e, "Failed to destroy content");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use trellis_sink::RecordingSink;

    fn image_visualizer(timeout_ms: i64, now: Instant) -> Visualizer {
        let poi = Poi::new("p").with_tracking_timeout_ms(timeout_ms);
        let trigger = TriggerObject::image("t", "l1", "poster", "p");
        Visualizer::for_image(&trigger, &poi, "poster".into(), Pose::IDENTITY, now)
    }

    #[test]
    fn test_content_created_once() {
        let sink = RecordingSink::new();
        let mut vis = image_visualizer(0, Instant::now());

        let first = vis.ensure_content(&sink).unwrap();
        let second = vis.ensure_content(&sink).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert_eq!(sink.creation_order().len(), 1);
        assert!(vis.first_placement_done());
    }

    #[test]
    fn test_failed_create_can_be_retried() {
        let sink = RecordingSink::new();
        sink.fail_creates_for("t");
        let mut vis = image_visualizer(0, Instant::now());

        assert!(vis.ensure_content(&sink).is_err());
        assert!(!vis.is_created());
        assert!(!vis.activate(&sink, Instant::now()));

        sink.allow_creates_for("t");
        let handle = vis.ensure_content(&sink).unwrap();
        assert!(handle.is_some());
        assert!(vis.is_created());
        assert_eq!(vis.ensure_content(&sink).unwrap(), handle);
        assert_eq!(sink.creation_order().len(), 1);
    }

    #[test]
    fn test_activate_and_deactivate_report_changes() {
        let sink = RecordingSink::new();
        let now = Instant::now();
        let mut vis = image_visualizer(0, now);
        assert!(!vis.activate(&sink, now), "no content yet");

        let handle = vis.ensure_content(&sink).unwrap().unwrap();
        assert!(vis.activate(&sink, now));
        assert!(!vis.activate(&sink, now));
        assert!(sink.is_active(handle));

        assert!(vis.deactivate(&sink));
        assert!(!vis.deactivate(&sink));
        assert!(!sink.is_active(handle));
    }

    #[test]
    fn test_touch_is_monotonic() {
        let start = Instant::now();
        let mut vis = image_visualizer(500, start + Duration::from_millis(100));
        vis.touch(start);
        assert_eq!(vis.last_update_time(), start + Duration::from_millis(100));
        vis.touch(start + Duration::from_millis(300));
        assert_eq!(vis.last_update_time(), start + Duration::from_millis(300));
    }

    #[test]
    fn test_expiry_boundary() {
        let start = Instant::now();
        let vis = image_visualizer(500, start);
        assert!(!vis.is_expired(start + Duration::from_millis(499)));
        assert!(vis.is_expired(start + Duration::from_millis(500)));

        let never = image_visualizer(0, start);
        assert!(!never.is_expired(start + Duration::from_secs(3600)));
    }

    #[test]
    fn test_pose_following() {
        let sink = RecordingSink::new();
        let now = Instant::now();
        let mut vis = image_visualizer(0, now);
        vis.ensure_content(&sink).unwrap();

        vis.update_pose(&sink, Pose::at(1.0, 0.0, 0.0));
        assert_eq!(vis.binding().pose().position, [1.0, 0.0, 0.0]);

        let poi = Poi::new("p");
        let trigger = TriggerObject::plane("t", "l1", "p");
        let mut placed =
            Visualizer::for_placement(&trigger, &poi, PlacementSlotId::new(0), Pose::IDENTITY, now);
        placed.ensure_content(&sink).unwrap();
        placed.update_pose(&sink, Pose::at(5.0, 0.0, 0.0));
        assert_eq!(placed.binding().pose(), &Pose::IDENTITY);

        let moves = sink
            .commands()
            .iter()
            .filter(|c| matches!(c, trellis_sink::SinkCommand::SetPose { .. }))
            .count();
        assert_eq!(moves, 1);
    }
}
