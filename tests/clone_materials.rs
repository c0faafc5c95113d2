// Material cloning and reference counting, end to end
//
// Exercises the full lifecycle of a texture + palette shared between a
// material and several clones, verifying that memory is freed exactly
// when the last reference disappears.

use trigon_rs::engine::Engine;
use trigon_rs::material::{Material, Palette, TextureFormat};

#[test]
fn test_clone_materials_release_memory_in_order() {
    let mut engine = Engine::new();
    engine.init_single().unwrap();

    let materials = engine.materials_mut().unwrap();
    let texture_free_at_start = materials.texture_free_bytes();
    let palette_free_at_start = materials.palette_free_bytes();

    // One 16x16 paletted texture plus its 256-color palette
    let texels = vec![0xABu8; TextureFormat::Pal256.texture_bytes(16, 16)];
    let colors = vec![0x7FFFu16; 256];

    let mut base = Material::new();
    materials
        .load_texture(&mut base, TextureFormat::Pal256, 16, 16, &texels)
        .unwrap();

    let mut palette = Palette::new();
    materials
        .load_palette(&mut palette, &colors, TextureFormat::Pal256)
        .unwrap();
    materials.set_material_palette(&mut base, &palette).unwrap();

    let texture_used = materials.texture_used_bytes();
    let palette_used = materials.palette_used_bytes();
    assert!(texture_used >= texels.len());
    assert!(palette_used >= colors.len() * 2);

    // Four clones share the same records; no extra memory is used
    let clones: Vec<Material> = (0..4)
        .map(|_| materials.clone_material(&base).unwrap())
        .collect();
    assert_eq!(materials.texture_used_bytes(), texture_used);
    assert_eq!(materials.palette_used_bytes(), palette_used);

    // Deleting every clone leaves the base material's references alive
    for clone in clones {
        materials.delete_material(clone).unwrap();
    }
    assert_eq!(materials.texture_used_bytes(), texture_used);
    assert_eq!(materials.palette_used_bytes(), palette_used);

    // Deleting the base frees the texture; the palette object still holds
    // its own reference to the colors
    materials.delete_material(base).unwrap();
    assert_eq!(materials.texture_free_bytes(), texture_free_at_start);
    assert_eq!(materials.palette_used_bytes(), palette_used);

    // Dropping the palette object releases the last reference
    materials.delete_palette(palette).unwrap();
    assert_eq!(materials.palette_free_bytes(), palette_free_at_start);
}

#[test]
fn test_reload_replaces_texture_without_leaking() {
    let mut engine = Engine::new();
    engine.init_single().unwrap();
    let materials = engine.materials_mut().unwrap();

    let texels = vec![0u8; TextureFormat::Direct.texture_bytes(8, 8)];
    let mut material = Material::new();
    materials
        .load_texture(&mut material, TextureFormat::Direct, 8, 8, &texels)
        .unwrap();
    let used_after_first = materials.texture_used_bytes();

    // Reloading releases the old record before allocating the new one
    materials
        .load_texture(&mut material, TextureFormat::Direct, 8, 8, &texels)
        .unwrap();
    assert_eq!(materials.texture_used_bytes(), used_after_first);

    materials.delete_material(material).unwrap();
    assert_eq!(materials.texture_used_bytes(), 0);
}

#[test]
fn test_teardown_discards_material_pools() {
    let mut engine = Engine::new();
    engine.init_single().unwrap();

    let texels = vec![0u8; TextureFormat::Pal16.texture_bytes(32, 32)];
    let mut material = Material::new();
    engine
        .materials_mut()
        .unwrap()
        .load_texture(&mut material, TextureFormat::Pal16, 32, 32, &texels)
        .unwrap();

    engine.teardown();
    assert!(engine.materials().is_none());

    // A fresh init starts from empty pools
    engine.init_single().unwrap();
    assert_eq!(engine.materials().unwrap().texture_used_bytes(), 0);
}
