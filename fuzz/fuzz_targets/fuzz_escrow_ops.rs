#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use trustescrow_core::digest::data_hash;
use trustescrow_core::{
    Address, Chain, Demand, DepositParams, DeterministicCheckValidator, EscrowId,
    MediationDecision, OptimisticMediationValidator, TrustEscrowError,
};

const GENESIS: u64 = 1_000;
const ESCROWER: Address = Address([0x0a; 20]);
const SERVER: Address = Address([0x0b; 20]);
const MEDIATOR: Address = Address([0x0c; 20]);

#[derive(Debug, Arbitrary)]
enum Op {
    Deposit {
        mediated: bool,
        amount: u16,
        attached: u16,
        lifetime: u16,
        min_validation: u8,
        payload: u8,
    },
    Request { mediated: bool, payload: u8 },
    Claim { escrow: u8, payload: u8 },
    Reclaim { escrow: u8, by_server: bool },
    Validate { escrow: u8, payload: u8 },
    Mediate { accept: bool, payload: u8, by_mediator: bool },
    Advance { secs: u16 },
}

#[derive(Debug, Arbitrary)]
struct Input {
    funds: u32,
    ops: Vec<Op>,
}

fn payload(p: u8) -> Vec<u8> {
    vec![p % 4; 3]
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let Ok(input) = Input::arbitrary(&mut u) else {
        return;
    };

    let mut chain = Chain::new(GENESIS);
    let checker = chain.deploy_validator(Box::new(DeterministicCheckValidator::new()));
    let desk = chain.deploy_validator(Box::new(OptimisticMediationValidator::new()));
    let Ok(server_agent) = chain.register_agent(SERVER, "server", SERVER) else {
        return;
    };
    let Ok(checker_agent) = chain.register_agent(checker, "checker", checker) else {
        return;
    };
    let Ok(desk_agent) = chain.register_agent(desk, "desk", desk) else {
        return;
    };
    let funds = u128::from(input.funds);
    if chain.fund(ESCROWER, funds).is_err() {
        return;
    }

    let mut settled: Vec<bool> = Vec::new();
    for op in input.ops {
        let before = chain.escrow_count();
        match op {
            Op::Deposit {
                mediated,
                amount,
                attached,
                lifetime,
                min_validation,
                payload: p,
            } => {
                let (validator_agent_id, demand) = if mediated {
                    (desk_agent, Demand::mediation(MEDIATOR, chain.now() + u64::from(lifetime / 2)))
                } else {
                    (checker_agent, Demand::content(payload(p)))
                };
                let Ok(demand) = demand else { continue };
                let params = DepositParams {
                    validator_agent_id,
                    server_agent_id: server_agent,
                    amount: u128::from(amount),
                    expiration_time: chain.now() + u64::from(lifetime),
                    min_validation,
                    demand,
                };
                match chain.deposit_escrow(ESCROWER, &params, u128::from(attached)) {
                    Ok(id) => {
                        assert_eq!(id, EscrowId(before));
                        settled.push(false);
                    }
                    Err(_) => assert_eq!(chain.escrow_count(), before),
                }
            }
            Op::Request { mediated, payload: p } => {
                let validator = if mediated { desk_agent } else { checker_agent };
                let _ = chain.request_validation(SERVER, validator, server_agent, data_hash(&payload(p)));
            }
            Op::Claim { escrow, payload: p } => {
                if settled.is_empty() {
                    continue;
                }
                let i = usize::from(escrow) % settled.len();
                let result = chain.claim_escrow(SERVER, EscrowId(i as u64), data_hash(&payload(p)));
                if settled[i] {
                    assert_eq!(result, Err(TrustEscrowError::InvalidEscrow));
                }
                if result.is_ok() {
                    settled[i] = true;
                }
            }
            Op::Reclaim { escrow, by_server } => {
                if settled.is_empty() {
                    continue;
                }
                let i = usize::from(escrow) % settled.len();
                let caller = if by_server { SERVER } else { ESCROWER };
                let result = chain.reclaim_expired(caller, EscrowId(i as u64));
                if settled[i] {
                    assert_eq!(result, Err(TrustEscrowError::InvalidEscrow));
                }
                if by_server {
                    assert!(result.is_err());
                }
                if result.is_ok() {
                    settled[i] = true;
                }
            }
            Op::Validate { escrow, payload: p } => {
                if settled.is_empty() {
                    continue;
                }
                let i = usize::from(escrow) % settled.len();
                let _ = chain.validate_escrow(ESCROWER, EscrowId(i as u64), data_hash(&payload(p)));
            }
            Op::Mediate {
                accept,
                payload: p,
                by_mediator,
            } => {
                let decision = if accept {
                    MediationDecision::Accepted
                } else {
                    MediationDecision::Rejected
                };
                let caller = if by_mediator { MEDIATOR } else { SERVER };
                let _ = chain.mediate(caller, desk, data_hash(&payload(p)), decision);
            }
            Op::Advance { secs } => {
                chain.advance_time(u64::from(secs));
            }
        }

        let custody = chain.custody();
        assert_eq!(chain.total_locked(), chain.balance_of(&custody));
        assert_eq!(
            chain.balance_of(&ESCROWER) + chain.balance_of(&SERVER) + chain.balance_of(&custody),
            funds
        );
        for (i, done) in settled.iter().enumerate() {
            assert_eq!(chain.get_escrow(EscrowId(i as u64)).claimed, *done);
        }
    }
});
