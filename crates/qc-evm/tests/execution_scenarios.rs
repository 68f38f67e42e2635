//! # End-to-End Execution Scenarios
//!
//! Drives [`Evm`] through complete transactions and messages with
//! hand-assembled bytecode.
//!
//! ## Test Categories
//!
//! 1. **Arithmetic** - operand order through a full transaction
//! 2. **Gas** - warm/cold pricing, SSTORE refunds, intrinsic gas, 63/64 forwarding,
//!    value-transfer stipend
//! 3. **Call Frames** - depth limit, delegate/callcode context, static propagation,
//!    log rollback
//! 4. **Creation** - CREATE2 determinism, EIP-6780 self-destruct
//! 5. **Transaction Scope** - transient storage, revert reasons

use qc_evm::adapters::TraceEvent;
use qc_evm::prelude::*;
use tracing_subscriber::EnvFilter;

// =============================================================================
// TEST HELPERS
// =============================================================================

const CALLER: Address = Address::new([0xCA; 20]);

/// Routes engine logs to the test output; `RUST_LOG=qc_evm=debug` shows frames.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn addr(n: u64) -> Address {
    Address::from_low_u64(0x1000 + n)
}

fn evm(fork: Hardfork) -> Evm {
    init_tracing();
    let mut evm = Evm::new(EvmConfig::for_hardfork(fork));
    evm.state_mut()
        .insert_account(CALLER, Account::new_eoa(U256::from(10u128.pow(18)), 0));
    evm
}

fn deploy<T: Tracer>(evm: &mut Evm<T>, address: Address, code: &[u8]) {
    evm.state_mut()
        .insert_account(address, Account::new_contract(U256::zero(), Bytes::from_slice(code)));
}

fn push20(address: Address) -> Vec<u8> {
    let mut out = vec![0x73];
    out.extend_from_slice(address.as_bytes());
    out
}

/// `<kind>(GAS, target, [0,] 0, 0, 0, 0)`, result left on the stack.
fn call_all_gas(opcode: u8, target: Address) -> Vec<u8> {
    let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00];
    if opcode == 0xF1 || opcode == 0xF2 {
        code.extend_from_slice(&[0x60, 0x00]);
    }
    code.extend(push20(target));
    code.extend_from_slice(&[0x5A, opcode]);
    code
}

/// `mstore(0, top); return(0, 32)`
const RETURN_TOP: [u8; 8] = [0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xF3];

fn tx_to(to: Address, gas_limit: u64) -> Transaction {
    Transaction {
        caller: CALLER,
        to: Some(to),
        gas_limit,
        ..Transaction::default()
    }
}

fn message_to(to: Address, gas_limit: u64) -> Message {
    Message {
        caller: CALLER,
        to: Some(to),
        gas_limit,
        ..Message::default()
    }
}

fn output_word(result: &ExecutionResult) -> U256 {
    U256::from_big_endian(result.output.as_slice())
}

// =============================================================================
// ARITHMETIC
// =============================================================================

#[test]
fn test_add_and_sub_through_transaction() {
    let mut evm = evm(Hardfork::Cancun);
    // PUSH1 3, PUSH1 4, ADD, PUSH1 3, PUSH1 10, SUB, ADD -> 7 + 7
    let mut code = vec![0x60, 0x03, 0x60, 0x04, 0x01, 0x60, 0x03, 0x60, 0x0A, 0x03, 0x01];
    code.extend_from_slice(&RETURN_TOP);
    deploy(&mut evm, addr(1), &code);

    let result = evm.transact(&tx_to(addr(1), 100_000)).unwrap();
    assert!(result.is_success());
    assert_eq!(output_word(&result), U256::from(14));
    assert_eq!(evm.state_mut().nonce(&CALLER).unwrap(), 1);
}

// =============================================================================
// GAS
// =============================================================================

#[test]
fn test_berlin_cold_then_warm_sload() {
    let mut evm = evm(Hardfork::Berlin).with_tracer(TraceCollector::new());
    // PUSH1 0, SLOAD, PUSH1 0, SLOAD
    deploy(&mut evm, addr(1), &[0x60, 0x00, 0x54, 0x60, 0x00, 0x54]);

    let result = evm.execute(&message_to(addr(1), 100_000)).unwrap();
    assert!(result.is_success());

    let sload_costs: Vec<u64> = evm
        .tracer()
        .steps()
        .filter(|step| step.opcode == 0x54)
        .map(|step| step.gas_cost)
        .collect();
    assert_eq!(sload_costs, vec![2100, 100]);
}

#[test]
fn test_istanbul_sload_flat_price() {
    let mut evm = evm(Hardfork::Istanbul).with_tracer(TraceCollector::new());
    deploy(&mut evm, addr(1), &[0x60, 0x00, 0x54, 0x60, 0x00, 0x54]);

    evm.execute(&message_to(addr(1), 100_000)).unwrap();
    let sload_costs: Vec<u64> = evm
        .tracer()
        .steps()
        .filter(|step| step.opcode == 0x54)
        .map(|step| step.gas_cost)
        .collect();
    assert_eq!(sload_costs, vec![800, 800]);
}

#[test]
fn test_sstore_reset_and_restore_refund() {
    let mut evm = evm(Hardfork::London);
    // SSTORE(0, 0), SSTORE(0, 1) on a slot holding 1
    deploy(&mut evm, addr(1), &[0x60, 0x00, 0x60, 0x00, 0x55, 0x60, 0x01, 0x60, 0x00, 0x55, 0x00]);
    evm.state_mut().insert_storage(addr(1), U256::zero(), U256::one());

    let result = evm.transact(&tx_to(addr(1), 100_000)).unwrap();
    assert!(result.is_success());
    // 21000 + 4 pushes + cold reset (5000) + dirty write (100)
    let used_before_refund = 21_000 + 12 + 5_000 + 100;
    // +4800 clear, then -4800 and +(2900 - 100) restoring the original
    assert_eq!(result.gas_refunded, 2_800);
    assert_eq!(result.gas_used, used_before_refund - 2_800);
    assert_eq!(evm.state_mut().storage(&addr(1), U256::zero()).unwrap(), U256::one());
}

#[test]
fn test_sstore_set_and_clear_refund_is_capped() {
    let mut evm = evm(Hardfork::London);
    // SSTORE(0, 1), SSTORE(0, 0) on an empty slot
    deploy(&mut evm, addr(1), &[0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0x55, 0x00]);

    let result = evm.transact(&tx_to(addr(1), 100_000)).unwrap();
    assert!(result.is_success());
    let used_before_refund: u64 = 21_000 + 12 + 22_100 + 100;
    // 19900 earned, capped at a fifth of the gas used
    assert_eq!(result.gas_refunded, used_before_refund / 5);
    assert_eq!(result.gas_used, used_before_refund - used_before_refund / 5);
}

#[test]
fn test_intrinsic_gas_by_fork() {
    let mut evm = evm(Hardfork::Cancun);
    let mut tx = tx_to(addr(9), 21_019);
    tx.data = Bytes::from_slice(&[0x00, 0x01]);

    let result = evm.transact(&tx).unwrap();
    assert_eq!(result.status, ExecutionStatus::Halt);
    assert_eq!(result.error, Some(VmError::OutOfGas));
    assert_eq!(result.gas_used, 21_019);

    tx.gas_limit = 21_020;
    let result = evm.transact(&tx).unwrap();
    assert!(result.is_success());
    assert_eq!(result.gas_used, 21_020);

    let mut evm = self::evm(Hardfork::Petersburg);
    tx.gas_limit = 30_000;
    let result = evm.transact(&tx).unwrap();
    assert_eq!(result.gas_used, 21_000 + 4 + 68);
}

#[test]
fn test_access_list_prewarms_slot() {
    let mut evm = evm(Hardfork::Berlin).with_tracer(TraceCollector::new());
    deploy(&mut evm, addr(1), &[0x60, 0x05, 0x54, 0x00]);

    let mut tx = tx_to(addr(1), 100_000);
    tx.access_list = vec![AccessListItem {
        address: addr(1),
        storage_keys: vec![U256::from(5)],
    }];
    let result = evm.transact(&tx).unwrap();
    assert!(result.is_success());
    // 21000 + 2400 + 1900 intrinsic, PUSH1, warm SLOAD
    assert_eq!(result.gas_used, 21_000 + 2_400 + 1_900 + 3 + 100);
}

#[test]
fn test_call_forwards_at_most_63_64ths() {
    let mut evm = evm(Hardfork::Cancun).with_tracer(TraceCollector::new());
    deploy(&mut evm, addr(2), &[0x00]);
    // CALL(0xFF..FF, B, 0, 0, 0, 0, 0)
    let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00];
    code.extend(push20(addr(2)));
    code.push(0x7F);
    code.extend_from_slice(&[0xFF; 32]);
    code.extend_from_slice(&[0xF1, 0x00]);
    deploy(&mut evm, addr(1), &code);

    let result = evm.execute(&message_to(addr(1), 100_000)).unwrap();
    assert!(result.is_success());

    // 7 pushes, then the cold account surcharge
    let remaining = 100_000 - 21 - 2_600;
    let child = evm.tracer().calls().find(|call| call.depth == 1).unwrap();
    assert_eq!(child.gas_limit, remaining - remaining / 64);
}

/// `CALL(0xFF..FF, target, value, 0, 0, 0, 0), STOP`: seven pushes.
fn value_call(target: Address, value: u8) -> Vec<u8> {
    let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, value];
    code.extend(push20(target));
    code.push(0x7F);
    code.extend_from_slice(&[0xFF; 32]);
    code.extend_from_slice(&[0xF1, 0x00]);
    code
}

fn funded_message(to: Address, value: u64) -> Message {
    Message {
        value: U256::from(value),
        ..message_to(to, 100_000)
    }
}

#[test]
fn test_value_call_adds_stipend_to_existing_account() {
    let mut evm = evm(Hardfork::Cancun).with_tracer(TraceCollector::new());
    deploy(&mut evm, addr(2), &[0x00]);
    deploy(&mut evm, addr(1), &value_call(addr(2), 1));

    let result = evm.execute(&funded_message(addr(1), 10)).unwrap();
    assert!(result.is_success());

    // pushes, cold account, value transfer
    let remaining = 100_000 - 21 - 2_600 - 9_000;
    let child = evm.tracer().calls().find(|call| call.depth == 1).unwrap();
    assert_eq!(child.gas_limit, remaining - remaining / 64 + 2_300);
    // The unused stipend comes back with the rest of the child's gas.
    assert_eq!(result.gas_used, 21 + 2_600 + 9_000 - 2_300);
    assert_eq!(evm.state_mut().balance(&addr(2)).unwrap(), U256::one());
}

#[test]
fn test_value_call_to_empty_account_pays_new_account() {
    let mut evm = evm(Hardfork::Cancun).with_tracer(TraceCollector::new());
    let empty = addr(9);
    deploy(&mut evm, addr(1), &value_call(empty, 1));

    let result = evm.execute(&funded_message(addr(1), 10)).unwrap();
    assert!(result.is_success());

    let remaining = 100_000 - 21 - 2_600 - 9_000 - 25_000;
    let child = evm.tracer().calls().find(|call| call.depth == 1).unwrap();
    assert_eq!(child.gas_limit, remaining - remaining / 64 + 2_300);
    assert_eq!(result.gas_used, 21 + 2_600 + 9_000 + 25_000 - 2_300);
    assert_eq!(evm.state_mut().balance(&empty).unwrap(), U256::one());
    assert_eq!(evm.state_mut().balance(&addr(1)).unwrap(), U256::from(9));
}

#[test]
fn test_value_call_without_funds_returns_forwarded_gas() {
    let mut evm = evm(Hardfork::Cancun).with_tracer(TraceCollector::new());
    let empty = addr(9);
    deploy(&mut evm, addr(1), &value_call(empty, 200));

    let result = evm.execute(&funded_message(addr(1), 10)).unwrap();
    assert!(result.is_success());

    // No frame is entered; forwarded gas and stipend both come back.
    assert_eq!(evm.tracer().calls().filter(|call| call.depth == 1).count(), 0);
    let call_step = evm.tracer().steps().find(|step| step.opcode == 0xF1).unwrap();
    assert_eq!(call_step.gas_cost, 2_600 + 9_000 + 25_000 - 2_300);
    assert_eq!(result.gas_used, 21 + 2_600 + 9_000 + 25_000 - 2_300);
    assert_eq!(evm.state_mut().balance(&empty).unwrap(), U256::zero());
    assert_eq!(evm.state_mut().balance(&addr(1)).unwrap(), U256::from(10));
}

// =============================================================================
// CALL FRAMES
// =============================================================================

#[test]
fn test_call_depth_limit_is_1024() {
    // Native recursion: give the frames room.
    let handle = std::thread::Builder::new()
        .stack_size(512 * 1024 * 1024)
        .spawn(|| {
            let mut evm = evm(Hardfork::Cancun).with_tracer(TraceCollector::new());
            // CALL(GAS, ADDRESS, 0, 0, 0, 0, 0), STOP
            let code = [
                0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x30, 0x5A, 0xF1,
                0x00,
            ];
            deploy(&mut evm, addr(1), &code);

            let result = evm
                .execute(&message_to(addr(1), 1_000_000_000_000))
                .unwrap();
            let depths: Vec<usize> = evm.tracer().calls().map(|call| call.depth).collect();
            (result.is_success(), depths)
        })
        .unwrap();

    let (success, depths) = handle.join().unwrap();
    assert!(success);
    assert_eq!(depths.len(), 1025);
    assert_eq!(depths.iter().max(), Some(&1024));
}

/// Stores CALLER, CALLVALUE and ADDRESS in slots 0, 1 and 2.
const RECORD_CONTEXT: [u8; 13] = [
    0x33, 0x60, 0x00, 0x55, 0x34, 0x60, 0x01, 0x55, 0x30, 0x60, 0x02, 0x55, 0x00,
];

fn stored<T: Tracer>(evm: &mut Evm<T>, address: Address, slot: u64) -> U256 {
    evm.state_mut().storage(&address, U256::from(slot)).unwrap()
}

#[test]
fn test_delegatecall_keeps_parent_context() {
    let mut evm = evm(Hardfork::Cancun);
    let (proxy, library) = (addr(1), addr(2));
    deploy(&mut evm, library, &RECORD_CONTEXT);
    let mut code = call_all_gas(0xF4, library);
    code.push(0x00);
    deploy(&mut evm, proxy, &code);

    let message = Message {
        value: U256::from(5),
        ..message_to(proxy, 1_000_000)
    };
    assert!(evm.execute(&message).unwrap().is_success());

    assert_eq!(stored(&mut evm, proxy, 0), CALLER.to_word());
    assert_eq!(stored(&mut evm, proxy, 1), U256::from(5));
    assert_eq!(stored(&mut evm, proxy, 2), proxy.to_word());
    assert_eq!(stored(&mut evm, library, 0), U256::zero());
}

#[test]
fn test_callcode_runs_as_current_account() {
    let mut evm = evm(Hardfork::Cancun);
    let (proxy, library) = (addr(1), addr(2));
    deploy(&mut evm, library, &RECORD_CONTEXT);
    // CALLCODE(GAS, library, 3, 0, 0, 0, 0), STOP
    let mut code = vec![0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x03];
    code.extend(push20(library));
    code.extend_from_slice(&[0x5A, 0xF2, 0x00]);
    deploy(&mut evm, proxy, &code);

    let message = Message {
        value: U256::from(5),
        ..message_to(proxy, 1_000_000)
    };
    assert!(evm.execute(&message).unwrap().is_success());

    assert_eq!(stored(&mut evm, proxy, 0), proxy.to_word());
    assert_eq!(stored(&mut evm, proxy, 1), U256::from(3));
    assert_eq!(stored(&mut evm, proxy, 2), proxy.to_word());
    assert_eq!(stored(&mut evm, library, 0), U256::zero());
    assert_eq!(evm.state_mut().balance(&proxy).unwrap(), U256::from(5));
    assert_eq!(evm.state_mut().balance(&library).unwrap(), U256::zero());
}

#[test]
fn test_static_context_reaches_grandchild() {
    let mut evm = evm(Hardfork::Cancun).with_tracer(TraceCollector::new());
    let (root, a, b) = (addr(1), addr(2), addr(3));

    // B: SSTORE(0, 1)
    deploy(&mut evm, b, &[0x60, 0x01, 0x60, 0x00, 0x55, 0x00]);
    // A: CALL(GAS, B, 0, ...), return the success flag
    let mut code_a = call_all_gas(0xF1, b);
    code_a.extend_from_slice(&RETURN_TOP);
    deploy(&mut evm, a, &code_a);
    // root: STATICCALL(GAS, A, ...), STOP
    let mut code_root = call_all_gas(0xFA, a);
    code_root.push(0x00);
    deploy(&mut evm, root, &code_root);

    let result = evm.execute(&message_to(root, 1_000_000)).unwrap();
    assert!(result.is_success());

    let violation = evm
        .tracer()
        .steps()
        .find(|step| step.opcode == 0x55)
        .unwrap();
    assert_eq!(violation.depth, 2);
    assert_eq!(
        violation.error.as_deref(),
        Some(VmError::StaticCallViolation.to_string().as_str())
    );
    let b_end = evm.tracer().call_ends().find(|end| end.depth == 2).unwrap();
    assert!(!b_end.success);
    assert_eq!(b_end.gas_left, 0);
    assert_eq!(evm.state_mut().storage(&b, U256::zero()).unwrap(), U256::zero());
}

#[test]
fn test_reverted_child_logs_are_discarded() {
    let mut evm = evm(Hardfork::Cancun);
    let (parent, child) = (addr(1), addr(2));

    // child: LOG0(0, 0), REVERT(0, 0)
    deploy(&mut evm, child, &[0x60, 0x00, 0x60, 0x00, 0xA0, 0x60, 0x00, 0x60, 0x00, 0xFD]);
    // parent: LOG1(0, 0, 0xAA), CALL(GAS, child, ...), STOP
    let mut code = vec![0x60, 0xAA, 0x60, 0x00, 0x60, 0x00, 0xA1];
    code.extend(call_all_gas(0xF1, child));
    code.push(0x00);
    deploy(&mut evm, parent, &code);

    let result = evm.transact(&tx_to(parent, 200_000)).unwrap();
    assert!(result.is_success());
    assert_eq!(result.logs.len(), 1);
    assert_eq!(result.logs[0].address, parent);
    assert_eq!(result.logs[0].topics, vec![Hash::from_word(U256::from(0xAA))]);

    let result = evm.transact(&tx_to(child, 200_000)).unwrap();
    assert_eq!(result.status, ExecutionStatus::Revert);
    assert!(result.logs.is_empty());
}

#[test]
fn test_failed_call_rolls_back_value_transfer() {
    let mut evm = evm(Hardfork::Cancun);
    // INVALID
    deploy(&mut evm, addr(1), &[0xFE]);

    let mut tx = tx_to(addr(1), 50_000);
    tx.value = U256::from(1_000);
    let result = evm.transact(&tx).unwrap();
    assert_eq!(result.status, ExecutionStatus::Halt);
    assert_eq!(result.error, Some(VmError::InvalidOpcode(0xFE)));
    assert_eq!(result.gas_used, 50_000);
    assert_eq!(evm.state_mut().balance(&addr(1)).unwrap(), U256::zero());
    // The nonce bump survives the failure.
    assert_eq!(evm.state_mut().nonce(&CALLER).unwrap(), 1);
}

// =============================================================================
// CREATION
// =============================================================================

#[test]
fn test_create2_address_is_deterministic() {
    let mut evm = evm(Hardfork::Cancun);
    let factory = addr(1);
    // init: RETURN(0, 1) -> runtime code 0x00
    let init = [0x60, 0x01, 0x60, 0x00, 0xF3];

    // MSTORE(0, PUSH5 init), CREATE2(0, 27, 5, 0x42), return the address
    let mut code = vec![0x64];
    code.extend_from_slice(&init);
    code.extend_from_slice(&[0x60, 0x00, 0x52, 0x60, 0x42, 0x60, 0x05, 0x60, 0x1B, 0x60, 0x00, 0xF5]);
    code.extend_from_slice(&RETURN_TOP);
    deploy(&mut evm, factory, &code);

    let expected =
        compute_contract_address_create2(factory, Hash::from_word(U256::from(0x42)), &init);

    let result = evm.transact(&tx_to(factory, 200_000)).unwrap();
    assert!(result.is_success());
    assert_eq!(Address::from_word(output_word(&result)), expected);
    assert_eq!(evm.state_mut().code(&expected).unwrap().as_slice(), &[0x00]);
    assert_eq!(evm.state_mut().nonce(&expected).unwrap(), 1);

    // Same salt again collides and pushes zero.
    let result = evm.transact(&tx_to(factory, 200_000)).unwrap();
    assert!(result.is_success());
    assert_eq!(output_word(&result), U256::zero());
}

#[test]
fn test_create_transaction_deploys_code() {
    let mut evm = evm(Hardfork::Cancun);
    // MSTORE8(0, 0x2A), RETURN(0, 1)
    let init = [0x60, 0x2A, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xF3];
    let tx = Transaction {
        caller: CALLER,
        to: None,
        data: Bytes::from_slice(&init),
        gas_limit: 200_000,
        ..Transaction::default()
    };

    let result = evm.transact(&tx).unwrap();
    assert!(result.is_success());
    let created = result.created_address.unwrap();
    assert_eq!(created, compute_contract_address(CALLER, 0));
    assert_eq!(evm.state_mut().code(&created).unwrap().as_slice(), &[0x2A]);
    assert_eq!(evm.state_mut().nonce(&CALLER).unwrap(), 1);
}

#[test]
fn test_oversized_init_code_is_rejected_from_shanghai() {
    let tx = Transaction {
        caller: CALLER,
        to: None,
        data: Bytes::from_vec(vec![0x00; limits::MAX_INIT_CODE_SIZE + 1]),
        gas_limit: 10_000_000,
        ..Transaction::default()
    };

    let result = evm(Hardfork::Shanghai).transact(&tx).unwrap();
    assert!(matches!(result.error, Some(VmError::InitCodeSizeExceeded { .. })));
    assert_eq!(result.gas_used, 10_000_000);

    let result = evm(Hardfork::London).transact(&tx).unwrap();
    assert!(result.is_success());
}

#[test]
fn test_selfdestruct_of_existing_contract_keeps_account_from_cancun() {
    let beneficiary = addr(7);
    let mut code = push20(beneficiary);
    code.push(0xFF);

    for (fork, deleted) in [(Hardfork::Shanghai, true), (Hardfork::Cancun, false)] {
        let mut evm = evm(fork);
        evm.state_mut().insert_account(
            addr(1),
            Account::new_contract(U256::from(1_000), Bytes::from_slice(&code)),
        );

        let result = evm.transact(&tx_to(addr(1), 100_000)).unwrap();
        assert!(result.is_success(), "{fork}");
        assert_eq!(evm.state_mut().balance(&beneficiary).unwrap(), U256::from(1_000));
        assert_eq!(!evm.state_mut().exists(&addr(1)).unwrap(), deleted, "{fork}");
    }
}

#[test]
fn test_selfdestruct_in_creating_transaction_deletes_on_cancun() {
    let mut evm = evm(Hardfork::Cancun);
    let beneficiary = addr(7);
    let mut init = push20(beneficiary);
    init.push(0xFF);

    let tx = Transaction {
        caller: CALLER,
        to: None,
        value: U256::from(500),
        data: Bytes::from_vec(init),
        gas_limit: 200_000,
        ..Transaction::default()
    };
    let result = evm.transact(&tx).unwrap();
    assert!(result.is_success());

    let created = result.created_address.unwrap();
    assert!(!evm.state_mut().exists(&created).unwrap());
    assert_eq!(evm.state_mut().balance(&beneficiary).unwrap(), U256::from(500));
}

// =============================================================================
// TRANSACTION SCOPE
// =============================================================================

#[test]
fn test_transient_storage_cleared_between_transactions() {
    let mut evm = evm(Hardfork::Cancun);
    // if calldata is empty: TSTORE(1, 7); return TLOAD(1)
    let mut code = vec![
        0x36, 0x60, 0x09, 0x57, 0x60, 0x07, 0x60, 0x01, 0x5D, 0x5B, 0x60, 0x01, 0x5C,
    ];
    code.extend_from_slice(&RETURN_TOP);
    deploy(&mut evm, addr(1), &code);

    let result = evm.transact(&tx_to(addr(1), 100_000)).unwrap();
    assert_eq!(output_word(&result), U256::from(7));

    let mut tx = tx_to(addr(1), 100_000);
    tx.data = Bytes::from_slice(&[0x01]);
    let result = evm.transact(&tx).unwrap();
    assert!(result.is_success());
    assert_eq!(output_word(&result), U256::zero());
}

#[test]
fn test_revert_reason_is_decoded() {
    let mut evm = evm(Hardfork::Cancun);
    // CODECOPY(0, 12, 100), REVERT(0, 100), then the Error("nope") payload
    let mut code = vec![0x60, 0x64, 0x60, 0x0C, 0x60, 0x00, 0x39, 0x60, 0x64, 0x60, 0x00, 0xFD];
    code.extend_from_slice(&[0x08, 0xC3, 0x79, 0xA0]);
    let mut word = [0u8; 32];
    word[31] = 0x20;
    code.extend_from_slice(&word);
    word[31] = 4;
    code.extend_from_slice(&word);
    let mut text = [0u8; 32];
    text[..4].copy_from_slice(b"nope");
    code.extend_from_slice(&text);
    deploy(&mut evm, addr(1), &code);

    let result = evm.transact(&tx_to(addr(1), 100_000)).unwrap();
    assert_eq!(result.status, ExecutionStatus::Revert);
    assert_eq!(result.revert_reason.as_deref(), Some("nope"));
    assert_eq!(result.output.len(), 100);
    assert_eq!(result.gas_refunded, 0);
}

#[test]
fn test_trace_renders_json_lines() {
    let mut evm = evm(Hardfork::Cancun).with_tracer(TraceCollector::new());
    deploy(&mut evm, addr(1), &[0x60, 0x03, 0x60, 0x04, 0x01, 0x00]);
    evm.execute(&message_to(addr(1), 100_000)).unwrap();

    let rendered = evm.tracer().to_json_lines().unwrap();
    let events: Vec<serde_json::Value> = rendered
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    // call start, four steps, call end
    assert_eq!(events.len(), 6);
    assert_eq!(events[0]["event"], "call_start");
    assert_eq!(events[3]["opcode"], 0x01);
    assert_eq!(events[3]["gas_cost"], 3);
    assert_eq!(events[5]["event"], "call_end");
}

#[test]
fn test_call_step_follows_callee_events() {
    let mut evm = evm(Hardfork::Cancun).with_tracer(TraceCollector::new());
    deploy(&mut evm, addr(2), &[0x00]);
    let mut code = call_all_gas(0xF1, addr(2));
    code.push(0x00);
    deploy(&mut evm, addr(1), &code);
    evm.execute(&message_to(addr(1), 100_000)).unwrap();

    let events = evm.tracer().events();
    let child_start = events
        .iter()
        .position(|event| matches!(event, TraceEvent::CallStart(call) if call.depth == 1))
        .unwrap();
    let child_end = events
        .iter()
        .position(|event| matches!(event, TraceEvent::CallEnd(end) if end.depth == 1))
        .unwrap();
    let call_step = events
        .iter()
        .position(|event| matches!(event, TraceEvent::Step(step) if step.opcode == 0xF1))
        .unwrap();

    assert!(child_start < child_end);
    assert!(child_end < call_step);
    match &events[call_step] {
        TraceEvent::Step(step) => assert_eq!(step.depth, 0),
        other => panic!("expected a step, got {other:?}"),
    }
}
