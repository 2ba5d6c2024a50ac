//! Default crypto-trading toolkit.
//!
//! Used when a caller does not declare its own domain actions. Parameter
//! schemas are derived from the typed structs below so that the schema
//! shown to the oracle and the shape an executor deserializes stay in sync.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ActionDescriptor;

/// Claim an airdrop.
pub const CLAIM_AIRDROP: &str = "CLAIM_AIRDROP";
/// Analyze a token.
pub const ANALYZE_TOKEN: &str = "ANALYZE_TOKEN";
/// Create a conditional or scheduled swap.
pub const AUTO_TASK: &str = "AUTO_TASK";
/// Swap tokens now.
pub const SWAP_TOKEN: &str = "SWAP_TOKEN";
/// Query wallet balances.
pub const WALLET_PORTFOLIO: &str = "WALLET_PORTFOLIO";
/// Transfer tokens out of the agent wallet.
pub const SEND_TOKEN: &str = "SEND_TOKEN";
/// Create a new token.
pub const CREATE_TOKEN: &str = "CREATE_TOKEN";

/// Parameters of [`CLAIM_AIRDROP`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClaimAirdropParams {
    /// The name of the airdrop program to claim
    pub program_name: Option<String>,
}

/// Parameters of [`ANALYZE_TOKEN`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeTokenParams {
    /// The token symbol to analyze; at least one of tokenSymbol or tokenAddress is required
    pub token_symbol: Option<String>,
    /// The token contract address to analyze; at least one of tokenSymbol or tokenAddress is required
    pub token_address: Option<String>,
    /// Analyses to run, any of 'info', 'news', 'twitter'; defaults to all three
    pub analyze: Option<Vec<String>>,
}

/// Parameters shared by [`SWAP_TOKEN`] and [`AUTO_TASK`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SwapParams {
    /// Symbol of the token to sell; at least one of inputTokenSymbol or inputTokenCA is required
    pub input_token_symbol: Option<String>,
    /// Contract address of the token to sell; at least one of inputTokenSymbol or inputTokenCA is required
    #[serde(rename = "inputTokenCA")]
    pub input_token_ca: Option<String>,
    /// Symbol of the token to buy; at least one of outputTokenSymbol or outputTokenCA is required
    pub output_token_symbol: Option<String>,
    /// Contract address of the token to buy; at least one of outputTokenSymbol or outputTokenCA is required
    #[serde(rename = "outputTokenCA")]
    pub output_token_ca: Option<String>,
    /// Amount of the input token to swap; at least one of inputTokenAmount or inputTokenPercentage is required
    pub input_token_amount: Option<f64>,
    /// Percentage of the input token balance to swap; at least one of inputTokenAmount or inputTokenPercentage is required
    pub input_token_percentage: Option<f64>,
    /// Amount of the output token to receive
    pub output_token_amount: Option<f64>,
}

/// Parameters of [`AUTO_TASK`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AutoTaskParams {
    /// The swap to perform once the trigger fires
    #[serde(flatten)]
    pub swap: SwapParams,
    /// Price condition for the swap, "below" or "above"; at least one of delay or priceTarget is required
    pub price_condition: Option<String>,
    /// Price target for the swap
    pub price_target: Option<f64>,
    /// Token address or symbol the price target refers to
    pub token_target: Option<String>,
    /// Delay before the swap, e.g. "after 5 minutes"; at least one of delay or priceTarget is required
    pub delay: Option<String>,
}

/// Parameters of [`WALLET_PORTFOLIO`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletPortfolioParams {
    /// "walletBalance" or "tokenBalance", defaults to walletBalance
    pub query_type: Option<String>,
    /// Token symbol to query when queryType is "tokenBalance"
    pub token_symbol: Option<String>,
    /// Token contract address to query when queryType is "tokenBalance"
    pub token_address: Option<String>,
}

/// Parameters of [`SEND_TOKEN`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendTokenParams {
    /// The token symbol to transfer
    pub token_symbol: Option<String>,
    /// The token contract address to transfer
    pub token_address: Option<String>,
    /// The recipient wallet address
    pub recipient: Option<String>,
    /// The amount of tokens to transfer
    pub amount: Option<f64>,
}

/// Parameters of [`CREATE_TOKEN`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenParams {
    /// Name of the token to create
    pub name: String,
    /// Symbol of the token to create
    pub symbol: String,
    /// Image URL or attachment of the token to create
    pub image_url: Option<String>,
    /// Description of the token to create
    pub description: Option<String>,
    /// Twitter URL of the token to create
    pub twitter: Option<String>,
    /// Website URL of the token to create
    pub website: Option<String>,
    /// Telegram URL of the token to create
    pub telegram: Option<String>,
    /// Amount of the native token to buy right after creation
    pub buy_amount_sol: Option<f64>,
}

/// The default domain actions, in catalog order.
#[must_use]
pub fn default_actions() -> Vec<ActionDescriptor> {
    vec![
        ActionDescriptor::for_params::<ClaimAirdropParams>(
            CLAIM_AIRDROP,
            "Claim an airdrop for the user agent account",
        ),
        ActionDescriptor::for_params::<AnalyzeTokenParams>(
            ANALYZE_TOKEN,
            "Analyze the token trade info, twitter binding and news about the token by \
             given symbol or contract address",
        ),
        ActionDescriptor::for_params::<AutoTaskParams>(
            AUTO_TASK,
            "Perform an automatic token swap when specified conditions are met, such as \
             limit orders, scheduled transactions or other custom triggers",
        ),
        ActionDescriptor::for_params::<SwapParams>(
            SWAP_TOKEN,
            "Swap tokens; the native token is the default side when the user wants to buy \
             or sell a token",
        ),
        ActionDescriptor::for_params::<WalletPortfolioParams>(
            WALLET_PORTFOLIO,
            "Get the wallet total balance or a specific token balance in the agent wallet",
        ),
        ActionDescriptor::for_params::<SendTokenParams>(
            SEND_TOKEN,
            "Transfer tokens or the native token from the agent wallet to another address",
        ),
        ActionDescriptor::for_params::<CreateTokenParams>(
            CREATE_TOKEN,
            "Create a new token and buy a specified amount with the native token. Requires \
             the token name, symbol and image url",
        ),
    ]
}
