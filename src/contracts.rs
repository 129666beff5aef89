//! Solidity interfaces for the bridge contracts this relayer talks to.
//!
//! Both interfaces are declared inline with [`alloy_sol_types::sol!`] rather
//! than generated from a shipped ABI JSON file — the relayer only ever calls
//! `receiveMessage` and decodes two events, so the full contract ABI is not
//! needed.

use alloy_sol_types::sol;

sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    event Initiation(
        uint64 indexed burn_nonce,
        uint64 indexed metadata_nonce,
        uint32 indexed destination_domain,
        bytes32 recipient_commitment,
        uint256 amount,
        bytes32 nullifier,
        bytes32 new_sender_commitment,
        uint256 sender_leaf_index
    );
}

sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    event MessageSent(bytes message);

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IMessageTransmitter {
        function receiveMessage(bytes message, bytes attestation) external returns (bool success);
    }
}
