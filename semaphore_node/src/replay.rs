// semaphore_node/src/replay.rs

//! Scripted scenario replay: drives the vehicle along the path, cycles the
//! traffic lights through their schedules, renders synthetic camera frames
//! and feeds everything into the topic fabric. Stands in for the live
//! message transport so the whole pipeline runs against a TOML file.

use anyhow::{ensure, Context, Result};
use figment::{
    providers::{Format, Toml},
    Figment,
};
use nalgebra::Point3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use semaphore_core::prelude::{CameraModel, LightColor, Pose, TrafficLight, Waypoint};
use serde::Deserialize;
use std::path::Path;
use std::thread::{self, JoinHandle};
use tracing::info;

use crate::imaging::render_frame;
use crate::transport::TopicSenders;

fn default_dt() -> f64 {
    0.1
}

fn default_speed() -> f64 {
    11.0
}

fn default_spacing() -> f64 {
    1.0
}

/// One color phase of a light's fixed-time schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct Phase {
    pub color: LightColor,
    pub duration_s: f64,
}

/// A scripted traffic light: fixed position, cyclic schedule.
#[derive(Debug, Clone, Deserialize)]
pub struct LightSpec {
    pub position: [f64; 3],
    pub schedule: Vec<Phase>,
}

impl LightSpec {
    /// Ground-truth color at scenario time `t`.
    fn state_at(&self, t: f64) -> LightColor {
        let cycle: f64 = self.schedule.iter().map(|p| p.duration_s).sum();
        if cycle <= 0.0 {
            return LightColor::Unknown;
        }
        let mut remaining = t % cycle;
        for phase in &self.schedule {
            if remaining < phase.duration_s {
                return phase.color;
            }
            remaining -= phase.duration_s;
        }
        self.schedule.last().map_or(LightColor::Unknown, |p| p.color)
    }
}

/// The reference path as configured: a closed polygon densified to evenly
/// spaced waypoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PathSpec {
    pub vertices: Vec<[f64; 3]>,
    #[serde(default = "default_spacing")]
    pub spacing_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_dt")]
    pub dt_s: f64,
    #[serde(default = "default_speed")]
    pub speed_mps: f64,
    pub path: PathSpec,
    #[serde(default)]
    pub lights: Vec<LightSpec>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let scenario: Scenario = Figment::new()
            .merge(Toml::file(path))
            .extract()
            .with_context(|| format!("failed to load scenario {}", path.display()))?;
        ensure!(
            scenario.path.vertices.len() >= 2,
            "scenario path needs at least two vertices"
        );
        ensure!(scenario.path.spacing_m > 0.0, "waypoint spacing must be positive");
        ensure!(scenario.dt_s > 0.0, "dt_s must be positive");
        Ok(scenario)
    }

    /// Densifies the closed vertex polygon into the cyclic waypoint sequence.
    pub fn waypoints(&self) -> Vec<Waypoint> {
        let verts = &self.path.vertices;
        let spacing = self.path.spacing_m;
        let mut waypoints = Vec::new();
        for (i, a) in verts.iter().enumerate() {
            let b = &verts[(i + 1) % verts.len()];
            let a = Point3::new(a[0], a[1], a[2]);
            let b = Point3::new(b[0], b[1], b[2]);
            let seg = b - a;
            let len = seg.norm();
            let mut s = 0.0;
            // Endpoint exclusive: the next segment starts there.
            while s < len {
                let p = a + seg * (s / len);
                waypoints.push(Waypoint::new(p.x, p.y, p.z));
                s += spacing;
            }
        }
        waypoints
    }

    /// Traffic-light snapshot at scenario time `t`.
    pub fn lights_at(&self, t: f64) -> Vec<TrafficLight> {
        self.lights
            .iter()
            .map(|spec| TrafficLight {
                position: Point3::new(spec.position[0], spec.position[1], spec.position[2]),
                state: spec.state_at(t),
            })
            .collect()
    }
}

/// Pose on the cyclic waypoint loop at arc position `s`, heading along the
/// local segment direction.
pub fn pose_at(waypoints: &[Waypoint], s: f64) -> Pose {
    debug_assert!(waypoints.len() >= 2);
    let total: f64 = (0..waypoints.len())
        .map(|i| segment(waypoints, i).1)
        .sum();
    let mut remaining = s.rem_euclid(total);
    for i in 0..waypoints.len() {
        let (dir, len) = segment(waypoints, i);
        if remaining <= len {
            let p = waypoints[i].position + dir * remaining;
            let yaw = dir.y.atan2(dir.x);
            return Pose::with_yaw(p, yaw);
        }
        remaining -= len;
    }
    // rem_euclid keeps `remaining` within one lap; falling through means
    // floating-point slop at the seam.
    let p = waypoints[0].position;
    Pose::with_yaw(p, 0.0)
}

/// Unit direction and length of the segment from waypoint `i` to its cyclic
/// successor.
fn segment(waypoints: &[Waypoint], i: usize) -> (nalgebra::Vector3<f64>, f64) {
    let a = waypoints[i].position;
    let b = waypoints[(i + 1) % waypoints.len()].position;
    let seg = b - a;
    let len = seg.norm();
    (seg / len, len)
}

/// Spawns the replay source thread. Publishes the waypoint list once, then
/// one (pose, lights, frame) tuple per tick. Dropping the senders at the end
/// is the shutdown signal for the pipeline thread.
pub fn spawn(
    scenario: Scenario,
    camera: CameraModel,
    tx: TopicSenders,
    frames: u64,
    seed: u64,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let waypoints = scenario.waypoints();
        info!(
            waypoints = waypoints.len(),
            lights = scenario.lights.len(),
            frames,
            "replay started"
        );
        if tx.waypoints.send(waypoints.clone()).is_err() {
            return;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        for tick in 0..frames {
            let t = tick as f64 * scenario.dt_s;
            let pose = pose_at(&waypoints, scenario.speed_mps * t);
            let lights = scenario.lights_at(t);
            let frame = render_frame(&camera, &pose, &lights, &mut rng);

            // A dropped receiver means the pipeline is gone; stop replaying.
            if tx.pose.send(pose).is_err()
                || tx.lights.send(lights).is_err()
                || tx.frames.send(frame).is_err()
            {
                return;
            }
        }
        info!("replay finished");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square_scenario() -> Scenario {
        toml::from_str(
            r#"
            [path]
            vertices = [[0.0, 0.0, 0.0], [100.0, 0.0, 0.0], [100.0, 100.0, 0.0], [0.0, 100.0, 0.0]]
            spacing_m = 1.0

            [[lights]]
            position = [80.0, 3.0, 5.5]
            [[lights.schedule]]
            color = "red"
            duration_s = 10.0
            [[lights.schedule]]
            color = "green"
            duration_s = 10.0
            "#,
        )
        .unwrap()
    }

    #[test]
    fn densified_square_has_one_waypoint_per_meter() {
        let scenario = square_scenario();
        assert_eq!(scenario.waypoints().len(), 400);
    }

    #[test]
    fn schedule_cycles_through_phases() {
        let scenario = square_scenario();
        let light = &scenario.lights[0];
        assert_eq!(light.state_at(0.0), LightColor::Red);
        assert_eq!(light.state_at(9.9), LightColor::Red);
        assert_eq!(light.state_at(10.1), LightColor::Green);
        assert_eq!(light.state_at(20.5), LightColor::Red);
    }

    #[test]
    fn pose_follows_the_loop() {
        let scenario = square_scenario();
        let waypoints = scenario.waypoints();

        let pose = pose_at(&waypoints, 50.0);
        assert_abs_diff_eq!(pose.position.x, 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.position.y, 0.0, epsilon = 1e-9);

        // Past the first corner the vehicle heads along +y.
        let pose = pose_at(&waypoints, 150.0);
        assert_abs_diff_eq!(pose.position.x, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.position.y, 50.0, epsilon = 1e-9);
        let (_, _, yaw) = pose.orientation.euler_angles();
        assert_abs_diff_eq!(yaw, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);

        // Wraps around the lap.
        let pose = pose_at(&waypoints, 450.0);
        assert_abs_diff_eq!(pose.position.x, 50.0, epsilon = 1e-9);
    }
}
