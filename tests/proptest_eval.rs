use proptest::prelude::*;
use vocmap::eval::{evaluate, rank_detections, voc_ap, EvalOptions};

mod proptest_helpers;

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn average_precision_is_a_fraction(
        gt in proptest_helpers::arb_ground_truth(4, 6),
        preds in proptest_helpers::arb_predictions(4, 8),
    ) {
        let report = evaluate(&gt, &preds, &proptest_helpers::class_names(), &EvalOptions::default());
        for class in &report.classes {
            if let Some(ap) = class.average_precision {
                prop_assert!((0.0..=1.0 + 1e-12).contains(&ap), "{} AP {}", class.class_name, ap);
            }
            prop_assert!(class.true_positives <= class.ground_truth_count);
            prop_assert_eq!(class.true_positives + class.false_positives, class.detection_count);
        }
        prop_assert!((0.0..=1.0 + 1e-12).contains(&report.mean_average_precision));
    }

    #[test]
    fn evaluation_is_deterministic(
        gt in proptest_helpers::arb_ground_truth(4, 6),
        preds in proptest_helpers::arb_predictions(4, 8),
    ) {
        let classes = proptest_helpers::class_names();
        let first = evaluate(&gt, &preds, &classes, &EvalOptions::default());
        let second = evaluate(&gt, &preds, &classes, &EvalOptions::default());

        prop_assert_eq!(
            first.mean_average_precision.to_bits(),
            second.mean_average_precision.to_bits()
        );
        for (a, b) in first.classes.iter().zip(&second.classes) {
            prop_assert_eq!(&a.precision_curve, &b.precision_curve);
            prop_assert_eq!(&a.recall_curve, &b.recall_curve);
            prop_assert_eq!(a.average_precision.map(f64::to_bits), b.average_precision.map(f64::to_bits));
        }
    }

    #[test]
    fn exact_copies_score_full_map(
        (gt, preds) in proptest_helpers::arb_perfect_pair(4, 3),
    ) {
        // Overlapping same-label boxes can steal each other's match, so only
        // check classes whose every detection found its twin.
        let report = evaluate(&gt, &preds, &proptest_helpers::class_names(), &EvalOptions::default());
        for class in &report.classes {
            if class.true_positives == class.ground_truth_count && class.ground_truth_count > 0 {
                prop_assert_eq!(class.average_precision, Some(1.0));
            }
        }
    }

    #[test]
    fn envelope_is_non_increasing(
        gt in proptest_helpers::arb_ground_truth(3, 5),
        preds in proptest_helpers::arb_predictions(3, 8),
    ) {
        let report = evaluate(&gt, &preds, &proptest_helpers::class_names(), &EvalOptions::default());
        for class in &report.classes {
            if class.average_precision.is_none() {
                continue;
            }
            let envelope = voc_ap(&class.recall_curve, &class.precision_curve);
            for pair in envelope.precision.windows(2) {
                prop_assert!(pair[0] >= pair[1]);
            }
            for pair in class.recall_curve.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }

    #[test]
    fn ranking_is_descending_and_stable(preds in proptest_helpers::arb_predictions(4, 8)) {
        let flattened: Vec<_> = preds.iter().collect();
        let ranked = rank_detections(&preds);
        prop_assert_eq!(ranked.len(), flattened.len());

        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
            if pair[0].score == pair[1].score {
                let first = flattened.iter().position(|d| std::ptr::eq(*d, pair[0]));
                let second = flattened.iter().position(|d| std::ptr::eq(*d, pair[1]));
                prop_assert!(first < second);
            }
        }
    }
}
