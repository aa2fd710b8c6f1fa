use super::*;

fn spec(format: OutputFormat) -> OutputSpec {
    OutputSpec::new(320, 320, Fps::integer(25).unwrap(), format)
}

#[test]
fn gif_profile_builds_palette_pipeline() {
    let inv = spec(OutputFormat::Gif).invocation("ffmpeg").unwrap();
    assert_eq!(inv.program, OsString::from("ffmpeg"));
    assert_eq!(
        inv.args_lossy(),
        [
            "-loglevel",
            "verbose",
            "-y",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            "320x320",
            "-r",
            "25",
            "-i",
            "-",
            "-filter_complex",
            "[0:v]split[a][b];[a]palettegen[p];[b][p]paletteuse",
            "-r",
            "25",
            "output.gif",
        ]
    );
}

#[test]
fn mp4_profile_sets_codecs_and_bitrates() {
    let inv = spec(OutputFormat::Mp4).invocation("ffmpeg").unwrap();
    assert_eq!(
        inv.args_lossy()[13..],
        [
            "-c:v",
            "libx264",
            "-vb",
            "2500k",
            "-c:a",
            "aac",
            "-ab",
            "200k",
            "-pix_fmt",
            "yuv420p",
            "-r",
            "25",
            "output.mp4",
        ]
    );
}

#[test]
fn output_options_flow_into_arguments() {
    let inv = spec(OutputFormat::Gif)
        .with_out_path("renders/spin.gif")
        .with_overwrite(false)
        .with_log_level(EncoderLogLevel::Error)
        .invocation("ffmpeg")
        .unwrap();
    let args = inv.args_lossy();
    assert_eq!(args[1], "error");
    assert_eq!(args[2], "-n");
    assert_eq!(args.last().map(String::as_str), Some("renders/spin.gif"));
}

#[test]
fn rational_fps_is_passed_verbatim() {
    let inv = OutputSpec::new(64, 64, Fps::new(30000, 1001).unwrap(), OutputFormat::Gif)
        .invocation("ffmpeg")
        .unwrap();
    let args = inv.args_lossy();
    assert_eq!(args[10], "30000/1001");
    assert_eq!(args[args.len() - 2], "30000/1001");
}

#[test]
fn validation_catches_bad_values() {
    let mut s = spec(OutputFormat::Gif);
    s.width = 0;
    assert!(s.validate().is_err());

    let mut s = spec(OutputFormat::Gif);
    s.fps = Fps { num: 0, den: 1 };
    assert!(s.validate().is_err());

    // Odd sizes are fine for GIF but not for yuv420p MP4.
    let odd = OutputSpec::new(65, 64, Fps::integer(25).unwrap(), OutputFormat::Gif);
    assert!(odd.validate().is_ok());
    let odd = OutputSpec::new(65, 64, Fps::integer(25).unwrap(), OutputFormat::Mp4);
    assert!(odd.invocation("ffmpeg").is_err());

    let mut s = spec(OutputFormat::Mp4);
    s.bitrates.video = String::new();
    assert!(s.validate().is_err());
}

#[test]
fn dash_leading_output_paths_are_rejected() {
    for out in ["-", "-weird.gif", "-out/anim.gif"] {
        let s = spec(OutputFormat::Gif).with_out_path(out);
        assert!(
            matches!(s.validate(), Err(FramepipeError::Validation(_))),
            "{out}"
        );
        assert!(s.invocation("ffmpeg").is_err(), "{out}");
    }

    let inv = spec(OutputFormat::Gif)
        .with_out_path("./-weird.gif")
        .invocation("ffmpeg")
        .unwrap();
    assert_eq!(inv.args.last().unwrap(), "./-weird.gif");
}

#[test]
fn spec_json_fills_defaults() {
    let json = r#"{ "width": 64, "height": 48, "fps": { "num": 25, "den": 1 }, "format": "mp4" }"#;
    let s = OutputSpec::from_json_reader(json.as_bytes()).unwrap();
    assert_eq!(s, OutputSpec::new(64, 48, Fps::integer(25).unwrap(), OutputFormat::Mp4));
    assert_eq!(s.output_path(), PathBuf::from("output.mp4"));

    let err = OutputSpec::from_json_reader(r#"{ "format": "avi" }"#.as_bytes()).unwrap_err();
    assert!(matches!(err, FramepipeError::Config(_)));
}

#[test]
fn invocation_display_is_shell_like() {
    let inv = spec(OutputFormat::Gif).invocation("ffmpeg").unwrap();
    let line = inv.to_string();
    assert!(line.starts_with("ffmpeg -loglevel verbose -y -f rawvideo"));
    assert!(line.ends_with("-r 25 output.gif"));
}
