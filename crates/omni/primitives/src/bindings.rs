use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};

sol! {
    contract IEntryPoint {
        #[derive(Default, Serialize, Deserialize, Debug, PartialEq, Eq)]
        struct UserOperation {
            address sender;
            uint256 nonce;
            bytes initCode;
            bytes callData;
            uint256 callGasLimit;
            uint256 verificationGasLimit;
            uint256 preVerificationGas;
            uint256 maxFeePerGas;
            uint256 maxPriorityFeePerGas;
            bytes paymasterAndData;
            bytes signature;
        }

        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
        function getUserOpHash(UserOperation calldata userOp) external view returns (bytes32);
    }

    #[sol(all_derives)]
    contract IVersaOmniFactory {
        function createAccount(
            address[] memory validators,
            bytes[] memory validatorInitData,
            uint8[] memory validatorType,
            address[] memory hooks,
            bytes[] memory hooksInitData,
            address[] memory modules,
            bytes[] memory moduleInitData,
            uint256 salt
        ) external returns (address);

        function getAddress(
            address[] memory validators,
            bytes[] memory validatorInitData,
            uint8[] memory validatorType,
            address[] memory hooks,
            bytes[] memory hooksInitData,
            address[] memory modules,
            bytes[] memory moduleInitData,
            uint256 salt
        ) external view returns (address);

        function proxyCreationCode() external pure returns (bytes memory);

        function createAccountOnRemoteChain(
            uint16 dstChainId,
            address[] memory validators,
            bytes[] memory validatorInitData,
            uint8[] memory validatorType,
            address[] memory hooks,
            bytes[] memory hooksInitData,
            address[] memory modules,
            bytes[] memory moduleInitData
        ) external payable;

        function getPayload(
            address wallet,
            address[] memory validators,
            bytes[] memory validatorInitData,
            uint8[] memory validatorType,
            address[] memory hooks,
            bytes[] memory hooksInitData,
            address[] memory modules,
            bytes[] memory moduleInitData
        ) external view returns (bytes memory);

        function estimateNativeFee(uint16 dstChainId, bytes calldata payload) external view returns (uint256);

        function isTrustedRemote(uint16 srcChainId, bytes calldata path) external view returns (bool);
        function setTrustedRemote(uint16 remoteChainId, bytes calldata path) external;

        function setOracle(uint16 dstChainId, address sendOracle, address receiveOracle) external;
        function getOracle(uint16 dstChainId) external view returns (address sendOracle, address receiveOracle);

        function setRelayer(uint16 dstChainId, address sendRelayer, address receiveRelayer) external;
        function getRelayer(uint16 dstChainId) external view returns (address sendRelayer, address receiveRelayer);
    }

    contract IVersaOmniWallet {
        function initialize(
            address fallbackHandler,
            address[] memory validators,
            bytes[] memory validatorInitData,
            uint8[] memory validatorType,
            address[] memory hooks,
            bytes[] memory hooksInitData,
            address[] memory modules,
            bytes[] memory moduleInitData
        ) external;

        function normalExecute(address to, uint256 value, bytes calldata data, uint8 operation) external;
        function sudoExecute(address to, uint256 value, bytes calldata data, uint8 operation) external;
        function batchSudoSyncExecute(
            address[] calldata to,
            uint256[] calldata value,
            bytes[] calldata data,
            uint8[] calldata operation
        ) external;
    }

    contract IECDSAValidator {
        function setSigner(address signer) external;
    }
}
