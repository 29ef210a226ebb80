// SPDX-License-Identifier: CEPL-1.0
use crate::RenderSize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitFilter {
    Linear,
    Nearest,
}

/// Half-open pixel rectangle `(x0, y0) .. (x1, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BlitRect {
    pub fn covering(size: RenderSize) -> Self {
        BlitRect {
            x0: 0,
            y0: 0,
            x1: size.width.min(i32::MAX as u32) as i32,
            y1: size.height.min(i32::MAX as u32) as i32,
        }
    }
}

/// Composite of the last layer image onto a backbuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitPlan {
    pub src: BlitRect,
    pub dst: BlitRect,
    pub filter: BlitFilter,
}

/// Whole sprite space stretched over the whole surface.
pub fn plan_blit(sprite: RenderSize, surface: RenderSize, linear_supported: bool) -> BlitPlan {
    BlitPlan {
        src: BlitRect::covering(sprite),
        dst: BlitRect::covering(surface),
        filter: if linear_supported {
            BlitFilter::Linear
        } else {
            BlitFilter::Nearest
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sprite_space_stretched_to_surface() {
        let sprite = RenderSize {
            width: 640,
            height: 480,
        };
        let surface = RenderSize {
            width: 1024,
            height: 768,
        };
        let first = plan_blit(sprite, surface, true);
        assert_eq!(
            first.src,
            BlitRect {
                x0: 0,
                y0: 0,
                x1: 640,
                y1: 480
            }
        );
        assert_eq!(
            first.dst,
            BlitRect {
                x0: 0,
                y0: 0,
                x1: 1024,
                y1: 768
            }
        );
        assert_eq!(first.filter, BlitFilter::Linear);
        for _ in 0..100 {
            assert_eq!(plan_blit(sprite, surface, true), first);
        }
    }

    #[test]
    fn test_destination_follows_resize() {
        let sprite = RenderSize {
            width: 640,
            height: 480,
        };
        let plan = plan_blit(
            sprite,
            RenderSize {
                width: 300,
                height: 900,
            },
            false,
        );
        assert_eq!((plan.dst.x1, plan.dst.y1), (300, 900));
        assert_eq!(plan.filter, BlitFilter::Nearest);
    }
}
