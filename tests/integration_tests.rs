use image::{ImageBuffer, Rgb, RgbImage, Rgba};
use inkhide::{
    algorithm::AlgorithmKind,
    cli::{AlgorithmArgs, HideArgs, RecoverArgs, SimulateArgs},
    config::{AlgorithmConfig, BattleSettings, seed_from_password},
    error::StegoError,
    filter::FilterKind,
    handler::{handle_hide, handle_recover, handle_simulate},
    message::{MessageBits, MessageSink},
    raster::Raster,
};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// 一个辅助函数，用于创建一个带有随机像素的测试图像
fn create_test_image(path: &Path, width: u32, height: u32) {
    let mut img_buf = ImageBuffer::new(width, height);
    let mut raw_pixels = vec![0u8; (width * height * 4) as usize];
    rand::rng().fill_bytes(&mut raw_pixels);

    img_buf
        .pixels_mut()
        .zip(raw_pixels.chunks_exact(4))
        .for_each(|(pixel, chunk)| {
            *pixel = Rgba([chunk[0], chunk[1], chunk[2], 255]);
        });

    img_buf.save(path).expect("Failed to create test image.");
}

/// 可复现的随机载体图像
fn noisy_cover(width: u32, height: u32, seed: u64) -> Raster {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    Raster::from_image(RgbImage::from_fn(width, height, |_, _| Rgb(rng.random())))
}

fn random_message(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut message = vec![0u8; len];
    rng.fill_bytes(&mut message);
    message
}

fn hide(
    kind: AlgorithmKind,
    config: &AlgorithmConfig,
    cover: &mut Raster,
    message: &[u8],
    seed: u64,
) -> anyhow::Result<()> {
    let algorithm = kind.build(config.clone());
    let mut bits = MessageBits::from_bytes(message)?;
    algorithm.encode(&mut bits, cover, seed)?;
    Ok(())
}

fn reveal(
    kind: AlgorithmKind,
    config: &AlgorithmConfig,
    stego: &Raster,
    seed: u64,
) -> Result<Vec<u8>, StegoError> {
    let algorithm = kind.build(config.clone());
    let mut sink = MessageSink::new(Vec::new());
    algorithm.decode(stego, seed, &mut sink)?;
    Ok(sink.finish()?)
}

fn configs() -> Vec<AlgorithmConfig> {
    vec![
        AlgorithmConfig::default(),
        AlgorithmConfig::new(0, 2).unwrap().with_lsb_match(true),
        AlgorithmConfig::new(1, 3).unwrap().with_filter(FilterKind::Sobel),
        AlgorithmConfig::new(2, 2)
            .unwrap()
            .with_filter(FilterKind::Prewitt)
            .with_lsb_match(true),
        AlgorithmConfig::new(0, 1).unwrap().with_battle(BattleSettings {
            move_away: 20,
            init_shots: 8,
            shots_increase: 3,
            shot_range: 3,
        })
        .unwrap(),
    ]
}

/// 验证每种算法在多种配置下都能完整往返
#[test]
fn test_every_algorithm_round_trips() -> anyhow::Result<()> {
    let message = random_message(300, 1);
    let seed = seed_from_password("correct horse battery staple");

    for kind in AlgorithmKind::ALL {
        for config in configs() {
            let mut cover = noisy_cover(64, 64, 2);
            hide(kind, &config, &mut cover, &message, seed)?;
            let recovered = reveal(kind, &config, &cover, seed)?;
            assert_eq!(recovered, message, "{kind} with {config:?}");
        }
    }
    Ok(())
}

/// 相同的输入和种子必须得到逐字节相同的隐写图像
#[test]
fn test_encoding_is_deterministic() -> anyhow::Result<()> {
    let message = random_message(120, 3);
    for kind in AlgorithmKind::ALL {
        let config = AlgorithmConfig::new(0, 1)?.with_lsb_match(true);
        let mut a = noisy_cover(40, 40, 4);
        let mut b = noisy_cover(40, 40, 4);
        hide(kind, &config, &mut a, &message, 77)?;
        hide(kind, &config, &mut b, &message, 77)?;
        assert_eq!(a, b, "{kind}");
    }
    Ok(())
}

/// BlindHide 只触及扫描顺序上最前面的像素
#[test]
fn test_blind_hide_touches_only_the_first_pixels() -> anyhow::Result<()> {
    let original = noisy_cover(64, 64, 5);
    let mut stego = original.clone();
    let message = b"ten bytes!";
    hide(AlgorithmKind::BlindHide, &AlgorithmConfig::default(), &mut stego, message, 0)?;

    // 32 + 80 = 112 位，每像素 3 位：前 38 个像素。
    let touched = 112usize.div_ceil(3);
    let pixels = original.image().pixels().zip(stego.image().pixels());
    for (index, (before, after)) in pixels.enumerate() {
        if index >= touched {
            assert_eq!(before, after, "pixel {index} should be untouched");
        } else {
            for (b, a) in before.0.iter().zip(after.0.iter()) {
                assert_eq!(b & !1, a & !1, "only the lowest bit may change");
            }
        }
    }

    let recovered = reveal(AlgorithmKind::BlindHide, &AlgorithmConfig::default(), &stego, 0)?;
    assert_eq!(recovered, message);
    Ok(())
}

/// LSB 匹配每个通道最多改变一个单位
#[test]
fn test_lsb_matching_changes_by_at_most_one() -> anyhow::Result<()> {
    let original = noisy_cover(32, 32, 6);
    let config = AlgorithmConfig::default().with_lsb_match(true);
    for kind in AlgorithmKind::ALL {
        let mut stego = original.clone();
        hide(kind, &config, &mut stego, &random_message(100, 7), 9)?;
        let pixels = original.image().pixels().zip(stego.image().pixels());
        for (before, after) in pixels {
            for (b, a) in before.0.iter().zip(after.0.iter()) {
                assert!(b.abs_diff(*a) <= 1, "{kind}: {b} -> {a}");
            }
        }
    }
    Ok(())
}

/// 容量不足时返回错误，且不修改载体
#[test]
fn test_capacity_error_leaves_cover_untouched() -> anyhow::Result<()> {
    let original = noisy_cover(4, 4, 8);
    for kind in AlgorithmKind::ALL {
        let mut cover = original.clone();
        let algorithm = kind.build(AlgorithmConfig::default());
        assert!(!algorithm.capacity_check(1, &cover));

        let mut bits = MessageBits::from_bytes(b"x")?;
        let result = algorithm.encode(&mut bits, &mut cover, 1);
        assert!(
            matches!(result, Err(StegoError::Capacity { required: 58, available: 48 })),
            "{kind}: {result:?}"
        );
        assert_eq!(cover, original);
    }
    Ok(())
}

/// 从未隐写过的纯色图像中解码应当报告没有消息，连长度头都放不下的小图也一样
#[test]
fn test_plain_images_have_no_message() -> anyhow::Result<()> {
    let sizes = [(0, 0), (1, 1), (3, 3), (1, 10), (10, 1), (32, 32)];
    let configs = [AlgorithmConfig::default(), AlgorithmConfig::new(0, 2)?];
    for (width, height) in sizes {
        let black = Raster::new(width, height);
        let white = Raster::from_image(RgbImage::from_pixel(width, height, Rgb([255; 3])));
        for config in &configs {
            for kind in AlgorithmKind::ALL {
                for stego in [&black, &white] {
                    let result = reveal(kind, config, stego, 5);
                    assert!(
                        matches!(result, Err(StegoError::NoMessageFound)),
                        "{kind} on {width}x{height} with bits {}",
                        config.bits()
                    );
                }
            }
        }
    }
    Ok(())
}

/// 错误的密码不会恢复出原消息
#[test]
fn test_wrong_password_does_not_reveal() -> anyhow::Result<()> {
    let message = random_message(64, 10);
    let config = AlgorithmConfig::default();
    for kind in [AlgorithmKind::HideSeek, AlgorithmKind::BattleSteg] {
        let mut cover = noisy_cover(48, 48, 11);
        hide(kind, &config, &mut cover, &message, seed_from_password("right"))?;
        let attempt = reveal(kind, &config, &cover, seed_from_password("wrong"));
        assert!(attempt.map_or(true, |bytes| bytes != message), "{kind}");
    }
    Ok(())
}

/// 模拟图只标出编码时真正触及的像素
#[test]
fn test_simulation_matches_encoding() -> anyhow::Result<()> {
    let message = random_message(50, 12);
    for kind in AlgorithmKind::ALL {
        let config = AlgorithmConfig::new(0, 1)?;
        let original = noisy_cover(30, 30, 13);
        let algorithm = kind.build(config.clone());
        let map = algorithm.simulate(&MessageBits::from_bytes(&message)?, &original, 4)?;

        let mut stego = original.clone();
        hide(kind, &config, &mut stego, &message, 4)?;
        for (x, y, pixel) in map.enumerate_pixels() {
            if stego.image().get_pixel(x, y) != original.image().get_pixel(x, y) {
                assert_ne!(pixel.0, [0; 3], "{kind}: changed pixel ({x}, {y}) missing from map");
            }
        }
        assert!(map.pixels().any(|p| p.0 != [0; 3]));
    }
    Ok(())
}

/// 验证从隐藏到恢复的完整流程
#[test]
fn test_handle_hide_and_recover_integration() -> anyhow::Result<()> {
    // 1. 准备环境
    let dir = tempdir()?;
    let original_image_path = dir.path().join("original.png");
    let hidden_image_path = dir.path().join("hidden.png");
    let source_text_path = dir.path().join("source.txt");
    let recovered_text_path = dir.path().join("recovered.txt");

    create_test_image(&original_image_path, 100, 100);
    let original_text = "This is a test message for the handler! 这是一个给处理器的测试信息！";
    fs::write(&source_text_path, original_text)?;

    for kind in AlgorithmKind::ALL {
        let algorithm = AlgorithmArgs {
            algorithm: kind,
            end_bit: 1,
            lsb_match: true,
            password: Some("hunter2".to_string()),
            ..AlgorithmArgs::default()
        };

        // 2. 测试 handle_hide
        let hide_args = HideArgs {
            image: original_image_path.clone(),
            text: source_text_path.clone(),
            dest: Some(hidden_image_path.clone()),
            force: true,
            algorithm: algorithm.clone(),
        };
        handle_hide(hide_args)?;
        assert!(hidden_image_path.exists(), "Hidden image should be created.");

        // 3. 测试 handle_recover
        let recover_args = RecoverArgs {
            image: hidden_image_path.clone(),
            text: Some(recovered_text_path.clone()),
            force: true,
            algorithm,
        };
        handle_recover(recover_args)?;

        // 4. 验证结果
        let recovered_text = fs::read_to_string(&recovered_text_path)?;
        assert_eq!(original_text, recovered_text, "{kind}");
    }

    Ok(())
}

/// 验证当用户不提供输出路径时，是否能正确生成默认路径并完成操作
#[test]
fn test_handle_hide_and_recover_with_defaults() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let original_image_path = dir.path().join("original.bmp");
    let source_text_path = dir.path().join("source.txt");

    create_test_image(&original_image_path, 100, 100);
    let original_text = "Testing default path generation. 测试默认路径生成。";
    fs::write(&source_text_path, original_text)?;

    let hide_args = HideArgs {
        image: original_image_path.clone(),
        text: source_text_path.clone(),
        dest: None,
        force: false,
        algorithm: AlgorithmArgs::default(),
    };
    handle_hide(hide_args)?;

    // 结果总是保存为 PNG
    let expected_hidden_path = dir.path().join("doctored_original.png");
    assert!(
        expected_hidden_path.exists(),
        "Default hidden image should be created at: {:?}",
        expected_hidden_path
    );

    let recover_args = RecoverArgs {
        image: expected_hidden_path,
        text: None,
        force: false,
        algorithm: AlgorithmArgs::default(),
    };
    handle_recover(recover_args)?;

    let expected_recovered_path = dir.path().join("recovered_doctored_original.bin");
    assert!(
        expected_recovered_path.exists(),
        "Default recovered file should be created at: {:?}",
        expected_recovered_path
    );
    assert_eq!(fs::read_to_string(&expected_recovered_path)?, original_text);

    Ok(())
}

/// 验证覆盖保护机制以及 `--force` 标志是否按预期工作
#[test]
fn test_overwrite_protection_and_force_flag() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("image.png");
    let text_path = dir.path().join("text.txt");
    let dest_path = dir.path().join("dest.png");

    create_test_image(&image_path, 50, 50);
    fs::write(&text_path, "some text")?;

    // 场景一：目标文件已存在，不使用 --force
    fs::write(&dest_path, "this is a dummy file to be overwritten")?;
    let hide_args_no_force = HideArgs {
        image: image_path.clone(),
        text: text_path.clone(),
        dest: Some(dest_path.clone()),
        force: false,
        algorithm: AlgorithmArgs::default(),
    };
    let result = handle_hide(hide_args_no_force);
    assert!(result.is_err(), "Execution should fail without --force when file exists.");
    if let Err(e) = result {
        assert!(e.to_string().contains("Output file already exists"));
    }

    // 场景二：使用 --force
    let hide_args_with_force = HideArgs {
        image: image_path.clone(),
        text: text_path.clone(),
        dest: Some(dest_path.clone()),
        force: true,
        algorithm: AlgorithmArgs::default(),
    };
    let result = handle_hide(hide_args_with_force);
    assert!(result.is_ok(), "Execution should succeed with --force when file exists.");
    let dummy_content = fs::read(&dest_path)?;
    assert_ne!(dummy_content, b"this is a dummy file to be overwritten");

    Ok(())
}

/// 验证空间不足时的错误处理
#[test]
fn test_handle_hide_not_enough_space() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("small.png");
    let text_path = dir.path().join("large.txt");
    let dest_path = dir.path().join("dest.png");

    create_test_image(&image_path, 10, 10);
    fs::write(&text_path, "a".repeat(5000))?;

    let hide_args = HideArgs {
        image: image_path,
        text: text_path,
        dest: Some(dest_path.clone()),
        force: false,
        algorithm: AlgorithmArgs::default(),
    };
    let result = handle_hide(hide_args);

    assert!(result.is_err());
    if let Err(e) = result {
        assert!(e.to_string().contains("Not enough space"));
    }
    assert!(!dest_path.exists());

    Ok(())
}

/// 验证恢复未隐写的图像时给出错误，且不会留下输出文件
#[test]
fn test_handle_recover_without_message() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("blank.png");
    let text_path = dir.path().join("out.bin");
    RgbImage::new(20, 20).save(&image_path)?;

    let recover_args = RecoverArgs {
        image: image_path,
        text: Some(text_path.clone()),
        force: false,
        algorithm: AlgorithmArgs::default(),
    };
    let result = handle_recover(recover_args);
    assert!(result.is_err());
    assert!(!text_path.exists());

    Ok(())
}

/// 验证模拟命令生成与载体同尺寸的模拟图
#[test]
fn test_handle_simulate_writes_map() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let image_path = dir.path().join("cover.png");
    let text_path = dir.path().join("secret.bin");
    create_test_image(&image_path, 60, 40);
    fs::write(&text_path, random_message(80, 14))?;

    let simulate_args = SimulateArgs {
        image: image_path,
        text: text_path,
        dest: None,
        force: false,
        algorithm: AlgorithmArgs {
            algorithm: AlgorithmKind::BattleSteg,
            ..AlgorithmArgs::default()
        },
    };
    handle_simulate(simulate_args)?;

    let map = image::open(dir.path().join("simulated_cover.png"))?.to_rgb8();
    assert_eq!(map.dimensions(), (60, 40));
    assert!(map.pixels().any(|p| p.0 != [0; 3]));

    Ok(())
}
