#![no_main]

use libfuzzer_sys::fuzz_target;
use trustescrow_core::artifacts::ArtifactStore;
use trustescrow_core::digest::data_hash;
use trustescrow_core::validator::{EvaluationContext, Validator};
use trustescrow_core::{
    Demand, DeterministicCheckValidator, OptimisticMediationValidator, RubricValidator, Score,
};

fuzz_target!(|data: &[u8]| {
    let demand = Demand::from_bytes(data.to_vec());
    if let Ok(schema) = demand.decode() {
        let reencoded = Demand::encode(&schema).expect("decoded demand must re-encode");
        assert_eq!(reencoded.decode().expect("re-encoded demand must decode"), schema);
    }

    let mut store = ArtifactStore::new();
    let artifact = store.put(data.to_vec());
    let ctx = EvaluationContext {
        now: u64::from(data.first().copied().unwrap_or(0)),
        artifacts: &store,
    };
    let validators: [&dyn Validator; 3] = [
        &DeterministicCheckValidator,
        &OptimisticMediationValidator::new(),
        &RubricValidator,
    ];
    for v in validators {
        if let Ok(score) = v.evaluate(&ctx, &artifact, &demand) {
            assert!(score.value() <= Score::MAX_VALUE);
        }
    }
    if let Ok(content) = demand.decode_content() {
        let delivered = data_hash(&content.content);
        assert_eq!(
            DeterministicCheckValidator.evaluate(&ctx, &delivered, &demand),
            Ok(Score::FULL)
        );
    }
});
