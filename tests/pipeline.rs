//! End-to-end pipeline tests.
//!
//! The generation tests need the pretrained generator model, which is not checked into the
//! repository (see `models/README.md`). They skip themselves when it is absent so the rest of
//! the suite stays runnable everywhere.

use std::path::Path;

use rand::rngs::StdRng;
use rand::SeedableRng;

use facegen::asset::DEFAULT_MODEL_ASSET;
use facegen::generator::{FaceGenerator, FACE_SIZE};
use facegen::image::{Color, Image, Rect};
use facegen::overlay::{FaceRegion, Landmark, OverlaySession};

fn load_default_generator() -> Option<FaceGenerator> {
    if !Path::new(DEFAULT_MODEL_ASSET).exists() {
        eprintln!("'{DEFAULT_MODEL_ASSET}' not present, skipping model-dependent test");
        return None;
    }

    let mut generator = FaceGenerator::new();
    generator.load_default().unwrap();
    assert!(generator.is_operational());
    Some(generator)
}

#[test]
fn generated_faces_vary_with_the_latent_vector() {
    let Some(mut generator) = load_default_generator() else {
        return;
    };

    let a = generator
        .generate_face_with(&mut StdRng::seed_from_u64(1))
        .unwrap();
    let b = generator
        .generate_face_with(&mut StdRng::seed_from_u64(2))
        .unwrap();

    for face in [&a, &b] {
        assert_eq!(face.width(), FACE_SIZE);
        assert_eq!(face.height(), FACE_SIZE);
        for y in 0..FACE_SIZE {
            for x in 0..FACE_SIZE {
                assert_eq!(face.get(x, y).a(), 255);
            }
        }
    }

    // Different noise must produce different pixels.
    assert_ne!(a, b);
}

#[test]
fn full_face_replacement() {
    let Some(mut generator) = load_default_generator() else {
        return;
    };

    let mut source = Image::new(128, 128);
    source.clear(Color::WHITE);

    let region = FaceRegion::new(
        Rect::from_top_left(20, 30, 64, 64),
        vec![Landmark::new(36.0, 50.0), Landmark::new(68.0, 50.0)],
    );
    let mut session = OverlaySession::new(vec![region]);
    session.select(0);

    let result = session
        .swap_selected(&mut generator, &source)
        .expect("a face is selected")
        .unwrap();

    assert_eq!(result.resolution(), source.resolution());
    // The source stays white everywhere; the result differs only inside the pasted region.
    assert_eq!(source.get(0, 0), Color::WHITE);
    assert_eq!(result.get(0, 0), Color::WHITE);
    assert_eq!(result.get(100, 100), Color::WHITE);

    generator.close().unwrap();
    assert!(!generator.is_operational());
    assert!(matches!(
        generator.generate_face(),
        Err(facegen::Error::NotLoaded),
    ));
}
