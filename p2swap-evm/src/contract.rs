//! Solidity bindings.
//!
//! - [`IERC20`] - ERC-20 subset used to read balances and manage allowances
//! - [`TokenPermissions`] / [`PermitTransferFrom`] - Permit2 signature
//!   transfer structs, used to cross-check the dynamically hashed payload

use alloy_sol_types::sol;

sol! {
    /// Minimal ERC-20 interface.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address recipient, uint256 amount) external returns (bool);
    }
}

sol! {
    /// Token and amount a Permit2 signature authorizes.
    #[derive(Debug, PartialEq, Eq)]
    struct TokenPermissions {
        address token;
        uint256 amount;
    }

    /// Permit2 `SignatureTransfer` authorization.
    #[derive(Debug, PartialEq, Eq)]
    struct PermitTransferFrom {
        TokenPermissions permitted;
        address spender;
        uint256 nonce;
        uint256 deadline;
    }
}
