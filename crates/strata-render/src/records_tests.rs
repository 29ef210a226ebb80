//! Unit tests for GPU record layouts and indirect draw arguments

use super::*;
use glam::{vec2, vec4};

// ============================================================================
// LAYOUT
// ============================================================================

#[test]
fn test_record_sizes_match_shaders() {
    assert_eq!(std::mem::size_of::<ObjectRecord>(), 96);
    assert_eq!(std::mem::size_of::<Vertex>(), 64);
    assert_eq!(std::mem::size_of::<DrawCommand>(), 16);
    assert_eq!(std::mem::size_of::<FrameUniforms>(), 32);
}

#[test]
fn test_draw_offsets() {
    assert_eq!(DrawCommand::offset_of(0), 0);
    assert_eq!(DrawCommand::offset_of(3), 48);
}

// ============================================================================
// OBJECTS
// ============================================================================

#[test]
fn test_sprite_fields() {
    let o = ObjectRecord::sprite(vec2(0.3, -0.1), vec2(0.05, 0.05), 1.0, vec4(1.0, 0.5, 0.25, 1.0));
    assert_eq!(o.pos[..2], [0.3, -0.1]);
    assert_eq!(o.scale[..2], [0.05, 0.05]);
    assert_eq!(o.rotate[0], 1.0);
    assert_eq!(o.color, [1.0, 0.5, 0.25, 1.0]);
    assert_eq!(o.metadata[0], texture_kind::NONE);
}

#[test]
fn test_texture_source_encoding() {
    let base = ObjectRecord::default();
    let uv = vec4(0.0, 0.0, 0.5, 0.5);

    let o = base.with_texture(TextureSource::User(7), uv);
    assert_eq!(o.metadata[..2], [texture_kind::USER, 7]);
    assert_eq!(o.uvinfo, [0.0, 0.0, 0.5, 0.5]);

    let o = base.with_texture(TextureSource::PrevLayer(2), uv);
    assert_eq!(o.metadata[..2], [texture_kind::PREV_LAYER, 2]);
}

#[test]
fn test_objects_cast_to_bytes() {
    let objs = [ObjectRecord::default(); 3];
    assert_eq!(bytemuck::cast_slice::<_, u8>(&objs).len(), 288);
}

// ============================================================================
// INDIRECT DRAWS
// ============================================================================

#[test]
fn test_single_sprite_draw_on_layer_two() {
    let mut objects = vec![ObjectRecord::default(); 8];
    objects[0] = ObjectRecord::sprite(vec2(0.3, -0.1), vec2(0.05, 0.05), 1.0, vec4(1.0, 1.0, 1.0, 1.0));

    let mut table = [DrawCommand::default(); 4];
    write_draw(&mut table, 2, 6, 8 * VERTICES_PER_OBJECT).unwrap();

    let drawn: Vec<_> = table
        .iter()
        .enumerate()
        .filter(|(_, d)| d.vertex_count > 0)
        .collect();
    assert_eq!(drawn.len(), 1);
    assert_eq!(drawn[0].0, 2);
    assert_eq!(drawn[0].1.vertex_count, 6);
    assert_eq!(drawn[0].1.instance_count, 1);
    assert_eq!(drawn[0].1.first_vertex, 0);

    // The same bytes the GPU reads at offset 2 * 16.
    let bytes: &[u8] = bytemuck::cast_slice(&table);
    let at = DrawCommand::offset_of(2) as usize;
    assert_eq!(&bytes[at..at + 8], &[6, 0, 0, 0, 1, 0, 0, 0]);
}

#[test]
fn test_write_draw_rejects_bad_layer() {
    let mut table = [DrawCommand::default(); 4];
    assert_eq!(
        write_draw(&mut table, 4, 6, 60),
        Err(ScheduleError::LayerOutOfRange {
            layer: 4,
            layer_max: 4
        })
    );
}

#[test]
fn test_write_draw_rejects_vertex_overflow() {
    let mut table = [DrawCommand::default(); 2];
    assert!(matches!(
        write_draw(&mut table, 0, 61, 60),
        Err(ScheduleError::VertexCountExceeded { .. })
    ));
    assert_eq!(table[0], DrawCommand::default());
}

#[test]
fn test_redraw_overwrites_previous_count() {
    let mut table = [DrawCommand::default(); 2];
    write_draw(&mut table, 1, 12, 60).unwrap();
    write_draw(&mut table, 1, 0, 60).unwrap();
    assert_eq!(table[1], DrawCommand::triangles(0));
}
