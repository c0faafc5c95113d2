//! Material system unit tests

use super::*;

fn test_system() -> MaterialSystem {
    MaterialSystem::new(VramBanks::AB).unwrap()
}

#[test]
fn test_no_banks_rejected() {
    assert!(matches!(
        MaterialSystem::new(VramBanks::NONE),
        Err(VramError::InvalidConfig(_))
    ));
}

#[test]
fn test_format_sizes() {
    assert_eq!(TextureFormat::Pal4.texture_bytes(64, 64), 1024);
    assert_eq!(TextureFormat::Pal16.texture_bytes(64, 64), 2048);
    assert_eq!(TextureFormat::A3Pal32.texture_bytes(64, 200), 12800);
    assert_eq!(TextureFormat::Direct.texture_bytes(32, 32), 2048);
    assert_eq!(TextureFormat::A3Pal32.palette_entries(), Some(32));
    assert_eq!(TextureFormat::Direct.palette_entries(), None);
}

#[test]
fn test_load_texture_allocates() {
    let mut system = test_system();
    let free = system.texture_free_bytes();

    let mut material = Material::new();
    let data = vec![0xAA; TextureFormat::Pal256.texture_bytes(32, 32)];
    system
        .load_texture(&mut material, TextureFormat::Pal256, 32, 32, &data)
        .unwrap();

    assert!(material.has_texture());
    assert_eq!(material.texture_size(), Some((32, 32)));
    assert_eq!(system.texture_free_bytes(), free - data.len());
}

#[test]
fn test_reload_never_deduplicates() {
    let mut system = test_system();
    let mut material = Material::new();
    let data = vec![0x55; TextureFormat::Pal256.texture_bytes(16, 16)];

    system
        .load_texture(&mut material, TextureFormat::Pal256, 16, 16, &data)
        .unwrap();
    let used = system.texture_used_bytes();

    // Reloading identical content releases the old record and allocates
    // fresh; usage is unchanged but never doubled.
    system
        .load_texture(&mut material, TextureFormat::Pal256, 16, 16, &data)
        .unwrap();
    assert_eq!(system.texture_used_bytes(), used);
}

#[test]
fn test_palette_entry_count_checked() {
    let mut system = test_system();
    let mut palette = Palette::new();
    assert!(matches!(
        system.load_palette(&mut palette, &[0; 16], TextureFormat::A3Pal32),
        Err(VramError::InvalidConfig(_))
    ));
    assert!(!palette.is_loaded());

    system
        .load_palette(&mut palette, &[0x7FFF; 32], TextureFormat::A3Pal32)
        .unwrap();
    assert!(palette.is_loaded());
}

#[test]
fn test_clone_materials_share_memory() {
    let mut system = test_system();
    let total_tex = system.texture_free_bytes();
    let total_pal = system.palette_free_bytes();

    let mut material = Material::new();
    let data = vec![0; TextureFormat::A3Pal32.texture_bytes(64, 64)];
    system
        .load_texture(&mut material, TextureFormat::A3Pal32, 64, 64, &data)
        .unwrap();

    let mut palette = Palette::new();
    system
        .load_palette(&mut palette, &[0; 32], TextureFormat::A3Pal32)
        .unwrap();
    system.set_material_palette(&mut material, &palette).unwrap();

    let remaining_tex = system.texture_free_bytes();
    let remaining_pal = system.palette_free_bytes();

    // Five logical materials, one physical upload
    let mut clones = Vec::new();
    for _ in 0..4 {
        clones.push(system.clone_material(&material).unwrap());
    }
    assert_eq!(system.texture_free_bytes(), remaining_tex);
    assert_eq!(system.palette_free_bytes(), remaining_pal);

    // Deleting all but one material must not free anything
    for clone in clones {
        system.delete_material(clone).unwrap();
    }
    assert_eq!(system.texture_free_bytes(), remaining_tex);
    assert_eq!(system.palette_free_bytes(), remaining_pal);

    // Deleting the last material frees the texture; the palette object
    // still holds its own reference
    system.delete_material(material).unwrap();
    assert_eq!(system.texture_free_bytes(), total_tex);
    assert!(system.palette_free_bytes() < total_pal);

    system.delete_palette(palette).unwrap();
    assert_eq!(system.palette_free_bytes(), total_pal);
}

#[test]
fn test_delete_material_without_resources() {
    let mut system = test_system();
    system.delete_material(Material::new()).unwrap();
    system.delete_palette(Palette::new()).unwrap();
}

#[test]
fn test_set_palette_requires_loaded_palette() {
    let mut system = test_system();
    let mut material = Material::new();
    let palette = Palette::new();
    assert!(matches!(
        system.set_material_palette(&mut material, &palette),
        Err(VramError::InvalidConfig(_))
    ));
}
