// SPDX-License-Identifier: CEPL-1.0
//! Random sprites bouncing around each layer. The last layer holds a single
//! fullscreen quad that composites the others.
use glam::{Vec2, Vec4};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use strata_render::{ObjectRecord, RenderSize, TextureSource};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: f32,
    pub angle: f32,
    pub spin: f32,
    pub color: Vec4,
    pub source: TextureSource,
}

impl Sprite {
    fn record(&self) -> ObjectRecord {
        ObjectRecord::sprite(self.pos, Vec2::splat(self.size), self.angle, self.color)
            .with_texture(self.source, Vec4::new(0.0, 0.0, 1.0, 1.0))
    }
}

pub struct Scene {
    layers: Vec<Vec<Sprite>>,
    aspect: f32,
}

/// What a sprite on `layer` may sample. Layer images are only read from
/// layers below the one being drawn.
fn random_source(rng: &mut StdRng, layer: u32) -> TextureSource {
    match rng.random_range(0..4u32) {
        1 => TextureSource::User(0),
        2 if layer > 0 => TextureSource::Layer(rng.random_range(0..layer)),
        3 => TextureSource::PrevLayer(layer),
        _ => TextureSource::None,
    }
}

impl Scene {
    pub fn new(layer_count: usize, per_layer: u32, seed: u64, sprite: RenderSize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut layers = Vec::with_capacity(layer_count);
        for layer in 0..layer_count.saturating_sub(1) {
            let sprites = (0..per_layer)
                .map(|_| Sprite {
                    pos: Vec2::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)),
                    vel: Vec2::new(rng.random_range(-0.6..0.6), rng.random_range(-0.6..0.6)),
                    size: rng.random_range(0.03..0.18),
                    angle: rng.random_range(0.0..std::f32::consts::TAU),
                    spin: rng.random_range(-2.0..2.0),
                    color: Vec4::new(
                        rng.random_range(0.2..1.0),
                        rng.random_range(0.2..1.0),
                        rng.random_range(0.2..1.0),
                        1.0,
                    ),
                    source: random_source(&mut rng, layer as u32),
                })
                .collect();
            layers.push(sprites);
        }
        if layer_count > 0 {
            layers.push(Vec::new());
        }
        Scene {
            layers,
            aspect: sprite.width as f32 / sprite.height.max(1) as f32,
        }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn step(&mut self, dt: f32) {
        for s in self.layers.iter_mut().flatten() {
            s.pos += s.vel * dt;
            s.angle = (s.angle + s.spin * dt).rem_euclid(std::f32::consts::TAU);
            for axis in 0..2 {
                if s.pos[axis].abs() > 1.0 {
                    s.pos[axis] = s.pos[axis].clamp(-1.0, 1.0);
                    s.vel[axis] = -s.vel[axis];
                }
            }
        }
    }

    /// Writes `layer`'s objects into `out` and returns how many were written.
    pub fn fill(&self, layer: usize, out: &mut [ObjectRecord]) -> u32 {
        let Some(sprites) = self.layers.get(layer) else {
            return 0;
        };
        if layer + 1 == self.layers.len() {
            let Some(first) = out.first_mut() else {
                return 0;
            };
            // x is scaled by height/width in the compute stage
            *first = ObjectRecord::sprite(
                Vec2::ZERO,
                Vec2::new(2.0 * self.aspect, 2.0),
                0.0,
                Vec4::ONE,
            );
            return 1;
        }
        let n = sprites.len().min(out.len());
        for (dst, s) in out.iter_mut().zip(&sprites[..n]) {
            *dst = s.record();
        }
        n as u32
    }
}

/// RGBA8 checkerboard, `cell` pixels per square.
pub fn checker(size: u32, cell: u32) -> Vec<u8> {
    let cell = cell.max(1);
    let mut rgba = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let v = if ((x / cell) + (y / cell)) % 2 == 0 {
                255
            } else {
                64
            };
            rgba.extend_from_slice(&[v, v, v, 255]);
        }
    }
    rgba
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
