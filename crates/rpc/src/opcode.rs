//! The closed opcode set for protocol version 1 (§4.7, §6). Every client
//! message and every server response carries one of these as its first
//! byte; an unrecognized byte is a protocol violation (close `1002`).

/// Request opcodes a client may send. `PING` and `HANDSHAKE` share the same
/// `[opcode][payload]` framing as everything else (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Ping = 0,
    Handshake = 1,
    GetBlockNumber = 2,
    GetBlockByNumber = 3,
    GetBlockByHash = 4,
    GetBlockByChecksum = 5,
    GetBlockWitness = 6,
    GetGas = 7,
    GetTransactionByHash = 8,
    GetTransactionReceipt = 9,
    BroadcastTransaction = 10,
    GetPreimage = 11,
    GetBalance = 12,
    GetUtxos = 13,
    GetPublicKeyInfo = 14,
    GetChainId = 15,
    GetReorg = 16,
    GetCode = 17,
    GetStorageAt = 18,
    Call = 19,
    GetLatestEpoch = 20,
    GetEpochByNumber = 21,
    GetEpochByHash = 22,
    GetEpochTemplate = 23,
    SubmitEpoch = 24,
    SubscribeBlocks = 25,
    SubscribeEpochs = 26,
    Unsubscribe = 27,
}

impl Opcode {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        use Opcode::*;
        Ok(match value {
            0 => Ping,
            1 => Handshake,
            2 => GetBlockNumber,
            3 => GetBlockByNumber,
            4 => GetBlockByHash,
            5 => GetBlockByChecksum,
            6 => GetBlockWitness,
            7 => GetGas,
            8 => GetTransactionByHash,
            9 => GetTransactionReceipt,
            10 => BroadcastTransaction,
            11 => GetPreimage,
            12 => GetBalance,
            13 => GetUtxos,
            14 => GetPublicKeyInfo,
            15 => GetChainId,
            16 => GetReorg,
            17 => GetCode,
            18 => GetStorageAt,
            19 => Call,
            20 => GetLatestEpoch,
            21 => GetEpochByNumber,
            22 => GetEpochByHash,
            23 => GetEpochTemplate,
            24 => SubmitEpoch,
            25 => SubscribeBlocks,
            26 => SubscribeEpochs,
            27 => Unsubscribe,
            other => return Err(other),
        })
    }
}

/// Subscription channels a client may ask to be notified on (§4.7
/// "per-connection state"). `MEMPOOL` is named in the spec's subscription
/// type set even though no `SUBSCRIBE_MEMPOOL` opcode is listed among the
/// closed request opcodes — kept here since notifications (§4.7
/// "Notifications") are filtered by this type, not by request opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionType {
    Blocks,
    Epochs,
    Mempool,
}

/// WebSocket close codes (§4.7, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    Shutdown = 1001,
    ProtocolViolation = 1002,
    FatalAppError = 1008,
    UnknownClient = 1011,
    Capacity = 1013,
}

impl CloseCode {
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_opcode() {
        for byte in 0..=27u8 {
            assert_eq!(Opcode::try_from(byte).unwrap().as_u8(), byte);
        }
    }

    #[test]
    fn rejects_unknown_opcode() {
        assert_eq!(Opcode::try_from(200).unwrap_err(), 200);
    }
}
