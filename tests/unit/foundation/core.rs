use super::*;

#[test]
fn fps_display_matches_encoder_syntax() {
    assert_eq!(Fps::integer(25).unwrap().to_string(), "25");
    assert_eq!(Fps::new(30000, 1001).unwrap().to_string(), "30000/1001");
}

#[test]
fn fps_parses_whole_and_rational_rates() {
    assert_eq!("25".parse::<Fps>().unwrap(), Fps { num: 25, den: 1 });
    assert_eq!(
        "30000/1001".parse::<Fps>().unwrap(),
        Fps {
            num: 30000,
            den: 1001
        }
    );
    assert!("0".parse::<Fps>().is_err());
    assert!("25/0".parse::<Fps>().is_err());
    assert!("fast".parse::<Fps>().is_err());
}

#[test]
fn resolution_sizes() {
    let res = Resolution::new(64, 32).unwrap();
    assert_eq!(res.to_string(), "64x32");
    assert_eq!(res.row_len().unwrap(), 256);
    assert_eq!(res.frame_len().unwrap(), 64 * 32 * 4);
    assert!(Resolution::new(0, 32).is_err());
}
