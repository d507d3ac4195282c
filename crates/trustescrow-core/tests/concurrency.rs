use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use trustescrow_core::digest::data_hash;
use trustescrow_core::{
    Address, Chain, Demand, DepositParams, DeterministicCheckValidator, EscrowId, SharedChain,
    TrustEscrowError,
};

const ESCROWS: u64 = 32;
const RACERS: usize = 8;
const ESCROWER: Address = Address([0x01; 20]);
const SERVER: Address = Address([0x02; 20]);

fn shared_with_escrows() -> SharedChain {
    let mut chain = Chain::new(50_000);
    let v = chain.deploy_validator(Box::new(DeterministicCheckValidator::new()));
    let server_agent = chain.register_agent(SERVER, "server", SERVER).expect("server");
    let validator_agent = chain.register_agent(v, "validator", v).expect("validator");
    chain.fund(ESCROWER, u128::from(ESCROWS) * 10).expect("fund");
    for i in 0..ESCROWS {
        let content = i.to_be_bytes().to_vec();
        let params = DepositParams {
            validator_agent_id: validator_agent,
            server_agent_id: server_agent,
            amount: 10,
            expiration_time: 50_100,
            min_validation: 100,
            demand: Demand::content(content.clone()).expect("demand"),
        };
        chain.deposit_escrow(ESCROWER, &params, 10).expect("deposit");
        chain
            .request_validation(SERVER, validator_agent, server_agent, data_hash(&content))
            .expect("request");
    }
    SharedChain::new(chain)
}

#[test]
fn racing_claims_settle_each_escrow_once() {
    let shared = shared_with_escrows();
    let wins = Arc::new(AtomicUsize::new(0));
    let handles: Vec<_> = (0..RACERS)
        .map(|_| {
            let shared = shared.clone();
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                for i in 0..ESCROWS {
                    let h = data_hash(&i.to_be_bytes());
                    match shared.with(|c| c.claim_escrow(SERVER, EscrowId(i), h)) {
                        Ok(paid) => {
                            assert_eq!(paid, 10);
                            wins.fetch_add(1, Ordering::SeqCst);
                        }
                        Err(err) => assert_eq!(err, TrustEscrowError::InvalidEscrow),
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("racer");
    }

    assert_eq!(wins.load(Ordering::SeqCst), ESCROWS as usize);
    shared.with(|c| {
        assert_eq!(c.balance_of(&SERVER), u128::from(ESCROWS) * 10);
        assert_eq!(c.total_locked(), 0);
        assert_eq!(c.balance_of(&c.custody()), 0);
    });
}

#[test]
fn claims_and_reclaims_partition_by_time() {
    let shared = shared_with_escrows();
    let claimed = Arc::new(AtomicUsize::new(0));
    let reclaimed = Arc::new(AtomicUsize::new(0));

    let claimer = {
        let shared = shared.clone();
        let claimed = Arc::clone(&claimed);
        thread::spawn(move || {
            for i in 0..ESCROWS {
                let h = data_hash(&i.to_be_bytes());
                if shared.with(|c| c.claim_escrow(SERVER, EscrowId(i), h)).is_ok() {
                    claimed.fetch_add(1, Ordering::SeqCst);
                }
            }
        })
    };
    let clock = {
        let shared = shared.clone();
        thread::spawn(move || {
            for _ in 0..4 {
                shared.with(|c| c.advance_time(30));
                thread::yield_now();
            }
        })
    };
    claimer.join().expect("claimer");
    clock.join().expect("clock");

    shared.with(|c| c.set_time(60_000).expect("time"));
    let reclaimers: Vec<_> = (0..RACERS)
        .map(|_| {
            let shared = shared.clone();
            let reclaimed = Arc::clone(&reclaimed);
            thread::spawn(move || {
                for i in 0..ESCROWS {
                    if shared.with(|c| c.reclaim_expired(ESCROWER, EscrowId(i))).is_ok() {
                        reclaimed.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();
    for h in reclaimers {
        h.join().expect("reclaimer");
    }

    let claimed = claimed.load(Ordering::SeqCst);
    let reclaimed = reclaimed.load(Ordering::SeqCst);
    assert_eq!(claimed + reclaimed, ESCROWS as usize);
    shared.with(|c| {
        assert_eq!(c.balance_of(&SERVER), claimed as u128 * 10);
        assert_eq!(c.balance_of(&ESCROWER), reclaimed as u128 * 10);
        assert_eq!(c.total_locked(), 0);
    });
}
