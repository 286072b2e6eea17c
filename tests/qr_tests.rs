#[cfg(test)]
mod qr_proptests {

    use prop::string::string_regex;
    use proptest::prelude::*;

    use barcodism::*;

    pub fn ec_level_strategy() -> BoxedStrategy<ECLevel> {
        prop_oneof![Just(ECLevel::L), Just(ECLevel::M), Just(ECLevel::Q), Just(ECLevel::H)].boxed()
    }

    pub fn qr_strategy(regex: String, max_sz: usize) -> impl Strategy<Value = (ECLevel, String)> {
        ec_level_strategy().prop_flat_map(move |ecl| {
            let pattern = format!(r"{}{{1,{}}}", regex, max_sz);
            string_regex(&pattern).unwrap().prop_map(move |data| (ecl, data))
        })
    }

    fn read_back(ecl: ECLevel, data: &str) -> Vec<u8> {
        let qr = QRBuilder::new(data.as_bytes()).ec_level(ecl).build().unwrap();
        let img = render::render(&qr.to_grid(), &RenderOptions::default().module_size(3));
        Reader::default().read_one(&img).expect("Failed to read QR").payload
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn proptest_short_bytes(params in qr_strategy(r"[ -~]".to_string(), 60)) {
            let (ecl, data) = params;
            let decoded = read_back(ecl, &data);
            prop_assert_eq!(data.as_bytes(), decoded.as_slice());
        }
    }

    proptest! {
        #[test]
        #[ignore]
        fn proptest_numeric(params in qr_strategy("[0-9]".to_string(), 1276)) {
            let (ecl, data) = params;
            let decoded = read_back(ecl, &data);
            prop_assert_eq!(data.as_bytes(), decoded.as_slice());
        }

        #[test]
        #[ignore]
        fn proptest_alphanumeric(params in qr_strategy(r"[0-9A-Z $%*+\-./:]".to_string(), 1000)) {
            let (ecl, data) = params;
            let decoded = read_back(ecl, &data);
            prop_assert_eq!(data.as_bytes(), decoded.as_slice());
        }
    }
}

#[cfg(test)]
mod qr_tests {
    use test_case::test_case;

    use barcodism::{
        builder::Module,
        common::iter::EncRegionIter,
        reader::{binarize::BinaryImage, decode_grid},
        render::render,
        BarcodeError, ECLevel, QRBuilder, Reader, ReaderOptions, RenderOptions, Symbology, Version, QR,
    };

    #[test_case("Hello, world!🌎".to_string(), 1, ECLevel::L; "test_qr_1")]
    #[test_case("12345".to_string(), 1, ECLevel::Q; "test_qr_3")]
    #[test_case("B3@j🎮#Z%8v🍣K!🔑3zC^8📖&r💾F9*🔐b6🌼".repeat(3).to_string(), 7, ECLevel::L; "test_qr_5")]
    #[test_case("aAAAAAA1111111111111AAAAAAa".repeat(3).to_string(), 7, ECLevel::Q; "test_qr_7")]
    #[test_case( "B3@j🎮#Z%8v🍣K!🔑3zC^8📖&r💾F9*🔐b6🌼".repeat(4).to_string(), 10, ECLevel::L; "test_qr_9")]
    #[test_case("aAAAAAAAAA1111111111111111AAAAAAAAAAa".repeat(4).to_string(), 10, ECLevel::Q; "test_qr_11")]
    #[test_case("B3@j🎮#Z%8v🍣K!🔑3zC^8📖&r💾F9*🔐b6🌼".repeat(22).to_string(), 27, ECLevel::L; "test_qr_13")]
    #[test_case("aAAAAAAAAA111111111111111111AAAAAAAAAAa".repeat(20).to_string(), 27, ECLevel::Q; "test_qr_15")]
    #[test_case("aA00000298542515764186657331886415260738886433510273480049978764987230758543376676257538587037428591120694472658573041637".to_string(), 3, ECLevel::L; "test_qr_21")]
    fn test_qr(data: String, ver: usize, ecl: ECLevel) {
        let qr = QRBuilder::new(data.as_bytes())
            .version(Version::new(ver).unwrap())
            .ec_level(ecl)
            .build()
            .unwrap();

        let img = render(&qr.to_grid(), &RenderOptions::default().module_size(3));
        let res = Reader::default().read_one(&img).expect("Failed to read QR");

        assert_eq!(res.symbology, Symbology::Qr);
        assert_eq!(res.payload, data.as_bytes());
    }

    #[test]
    fn test_hello_v1_m() {
        let qr = QRBuilder::new(b"HELLO").ec_level(ECLevel::M).build().unwrap();
        assert_eq!(*qr.version(), 1);
        assert_eq!(qr.width(), 21);

        let decoded = decode_grid(&qr.to_grid()).unwrap();
        assert_eq!(decoded.payload, b"HELLO");
        assert_eq!(decoded.corrected, 0);
    }

    #[test]
    fn test_qr_0() {
        let data = "000003102240522040101032134589200040100032256802000001000230031030100051322320302010102287757583444005058202946794230192593114436932953370175316685191098675305648442486981451187345202833326821009949644832254029455434265792710428622979190276282956185887462621840559174608893562970842263910702908981904037304248915".to_string();
        let ecl = ECLevel::M;

        let qr = QRBuilder::new(data.as_bytes()).ec_level(ecl).build().unwrap();

        let img = render(&qr.to_grid(), &RenderOptions::default().module_size(3));
        let res = Reader::default().read_one(&img).expect("Failed to read QR");

        assert_eq!(res.text, data);
    }

    #[test]
    fn test_damaged_modules_within_capacity() {
        let data = "damage tolerant";
        let qr = QRBuilder::new(data.as_bytes()).ec_level(ECLevel::H).build().unwrap();
        let mut grid = qr.to_grid();
        for c in 9..13 {
            let dark = grid.is_dark(12, c);
            grid.set(12, c, !dark);
        }

        let decoded = decode_grid(&grid).unwrap();
        assert_eq!(decoded.payload, data.as_bytes());
        assert!(decoded.corrected > 0);
    }

    #[test]
    fn test_low_confidence_is_rejected() {
        let qr = QRBuilder::new(b"confident").ec_level(ECLevel::H).build().unwrap();
        let mut grid = qr.to_grid();
        for c in 9..13 {
            let dark = grid.is_dark(10, c);
            grid.set(10, c, !dark);
        }
        let img = render(&grid, &RenderOptions::default().module_size(4));

        let outcome = Reader::default().read(&img);
        assert_eq!(outcome.results.len(), 1);
        assert!(outcome.results[0].confidence < 1.0);

        let opts = ReaderOptions { confidence_threshold: 0.999, ..Default::default() };
        let outcome = Reader::new(opts).unwrap().read(&img);
        assert!(outcome.results.is_empty());
        assert!(!outcome.rejections.is_empty());
    }

    #[test_case(b"HELLO".to_vec(), ECLevel::M; "alphanumeric")]
    #[test_case(b"https://example.com/path?q=1".to_vec(), ECLevel::L; "bytes")]
    #[test_case(b"31415926535897932384626433832795".to_vec(), ECLevel::H; "numeric")]
    fn test_render_read_render(data: Vec<u8>, ecl: ECLevel) {
        let qr = QRBuilder::new(&data).ec_level(ecl).build().unwrap();
        let img = render(&qr.to_grid(), &RenderOptions::default().module_size(3));
        let res = Reader::default().read_one(&img).expect("Failed to read QR");

        let decoded = decode_grid(&qr.to_grid()).unwrap();
        let again = QRBuilder::new(&res.payload)
            .version(decoded.metadata.version)
            .ec_level(decoded.metadata.ec_level)
            .mask(decoded.metadata.mask)
            .build()
            .unwrap();
        assert_eq!(again.to_grid(), qr.to_grid());
    }

    // Modules of each codeword in placement order
    fn codeword_modules(ver: Version, ecl: ECLevel) -> Vec<Vec<(usize, usize)>> {
        let skeleton = QR::skeleton(ver, ecl);
        let total_bits = ver.total_codewords() * 8;
        let mut res = vec![Vec::with_capacity(8); ver.total_codewords()];
        let free = EncRegionIter::new(ver).filter(|&(r, c)| matches!(skeleton.get(r, c), Module::Empty));
        for (i, (r, c)) in free.take(total_bits).enumerate() {
            res[i / 8].push((r as usize, c as usize));
        }
        res
    }

    #[test_case(5, true; "at capacity")]
    #[test_case(6, false; "beyond capacity")]
    fn test_flipped_codewords(count: usize, readable: bool) {
        // Version 1-M holds 16 data and 10 ecc codewords in one block
        let qr = QRBuilder::new(b"HELLO").ec_level(ECLevel::M).build().unwrap();
        let mut grid = qr.to_grid();
        let codewords = codeword_modules(qr.version(), qr.ec_level());
        for &i in [1, 4, 7, 10, 13, 20].iter().take(count) {
            for &(r, c) in codewords[i].iter() {
                let dark = grid.is_dark(r, c);
                grid.set(r, c, !dark);
            }
        }
        let img = render(&grid, &RenderOptions::default().module_size(4));

        let outcome = Reader::default().read(&img);
        if readable {
            assert_eq!(outcome.results.len(), 1);
            assert_eq!(outcome.results[0].payload, b"HELLO");
            assert_eq!(decode_grid(&grid).unwrap().corrected, 5);
        } else {
            assert!(outcome.results.iter().all(|r| r.symbology != Symbology::Qr), "{:?}", outcome.results);
            assert!(outcome.rejections.iter().any(|r| r.symbology == Symbology::Qr));
            assert_eq!(decode_grid(&grid).err(), Some(BarcodeError::UncorrectableError));
        }
    }

    #[test]
    fn test_binarized_render_matches_grid() {
        let qr = QRBuilder::new(b"pixels").build().unwrap();
        let grid = qr.to_grid();
        let img = render(&grid, &RenderOptions::default().module_size(1).margin(0));
        let bin = BinaryImage::binarize(&img);
        for r in 0..grid.height() {
            for c in 0..grid.width() {
                assert_eq!(bin.is_dark(c as u32, r as u32), grid.is_dark(r, c), "({r}, {c})");
            }
        }
    }
}

#[cfg(test)]
mod rs_tests {
    use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

    use barcodism::{common::ec::rs_decode, common::ec::rs_encode, BarcodeError};

    #[test]
    fn test_random_errors_within_capacity() {
        let mut rng = StdRng::seed_from_u64(128);
        for _ in 0..50 {
            let k = rng.random_range(1..200);
            let ecc_len = 2 * rng.random_range(1..=(255 - k) / 2);
            let msg = (0..k).map(|_| rng.random::<u8>()).collect::<Vec<_>>();
            let mut enc = rs_encode(&msg, ecc_len).unwrap();

            let errs = rng.random_range(0..=ecc_len / 2);
            for i in sample(&mut rng, enc.len(), errs) {
                enc[i] ^= rng.random_range(1..=255u8);
            }
            assert_eq!(rs_decode(&enc, ecc_len).unwrap(), msg);
        }
    }

    #[test]
    fn test_too_many_errors() {
        let msg = b"beyond repair".to_vec();
        let mut enc = rs_encode(&msg, 4).unwrap();
        for b in enc.iter_mut().take(2) {
            *b ^= 0xff;
        }
        assert_eq!(rs_decode(&enc, 4).unwrap(), msg);

        for b in enc.iter_mut().skip(2).take(4) {
            *b ^= 0xff;
        }
        assert_eq!(rs_decode(&enc, 4), Err(BarcodeError::UncorrectableError));
    }

    #[test]
    fn test_random_errors_beyond_capacity() {
        // With 10 or more correctable codewords a word this corrupt is never
        // within reach of another codeword
        let mut rng = StdRng::seed_from_u64(255);
        for _ in 0..50 {
            let k = rng.random_range(1..150);
            let ecc_len = 2 * rng.random_range(10..=20);
            let msg = (0..k).map(|_| rng.random::<u8>()).collect::<Vec<_>>();
            let mut enc = rs_encode(&msg, ecc_len).unwrap();

            let errs = rng.random_range(ecc_len / 2 + 1..=ecc_len);
            for i in sample(&mut rng, enc.len(), errs) {
                enc[i] ^= rng.random_range(1..=255u8);
            }
            assert_eq!(rs_decode(&enc, ecc_len), Err(BarcodeError::UncorrectableError));
        }
    }
}
