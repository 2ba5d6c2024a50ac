//! Instruction text composed into contracts.
//!
//! Fragments are static; [`render_contract`](super::render_contract) joins
//! them per call, so no contract definition is ever shared mutably between
//! chains.

use super::ContractId;
use crate::types::Chain;

/// Chain-specific background framing.
#[must_use]
pub const fn background(chain: Chain) -> &'static str {
    match chain {
        Chain::Solana => {
            "You are the planning core of a crypto trading assistant that operates on the \
             Solana blockchain. The native token is SOL. Fungible tokens are SPL tokens, \
             identified by a symbol or by a base58 contract address of 32 to 44 characters. \
             New tokens are launched on pump.fun and bought with SOL."
        }
        Chain::Bsc => {
            "You are the planning core of a crypto trading assistant that operates on BNB \
             Smart Chain. The native token is BNB. Fungible tokens are BEP-20 tokens, \
             identified by a symbol or by a 0x-prefixed contract address of 42 characters. \
             New tokens are launched on four.meme and bought with BNB."
        }
    }
}

/// What the oracle is asked to do under a contract.
#[must_use]
pub const fn task_statement(id: ContractId) -> &'static str {
    match id {
        ContractId::FirstStep => {
            "The task below has just been declared. Break it into smaller steps and plan \
             the first action to take, based on the task definition, the latest user \
             message and the chat history. There are no past steps yet."
        }
        ContractId::LoopContinuation => {
            "You are called again because the previous step finished; the user has not \
             written anything new. Break the task into smaller steps and plan the next \
             action based only on the task definition and the past steps taken."
        }
        ContractId::SwitchOrContinue => {
            "The user has sent a new message while a task is in progress. Before choosing \
             an action, judge in this order:\n\
             1. same_task: does the new message still belong to the declared task? If it \
             asks for something else, choose \"SWITCH_TASK\" with the new task definition.\n\
             2. pending_step: is the last step pending on the user's input? Answer \
             \"repeat\" if the user agreed to it, \"skip\" if the user declined it, and \
             \"ignore\" if the last step is not pending.\n\
             3. task_status: is the task fully satisfied by the past steps?\n\
             Then plan the next action."
        }
        ContractId::InstructionPlan => {
            "Given a user prompt, the chat history and the list of actions you can take, \
             return the instructions to carry out the user's request."
        }
        ContractId::StepExecution => {
            "Given a user prompt, the chat history, a plan, the current step of that plan \
             and the list of actions, return the action to take for the current step and \
             its parameters."
        }
    }
}

/// Rules the decision must follow under a contract.
#[must_use]
pub const fn guidelines(id: ContractId) -> &'static str {
    match id {
        ContractId::FirstStep | ContractId::LoopContinuation | ContractId::SwitchOrContinue => {
            PLANNING_GUIDELINES
        }
        ContractId::InstructionPlan => {
            "1. Return high-level instructions step by step in natural language.\n\
             2. Base the instructions only on the user prompt and the action list.\n\
             3. Be direct and specific."
        }
        ContractId::StepExecution => {
            "1. Only return the action name from the action list, not the action description.\n\
             2. The parameters must follow the parameter schema of the chosen action."
        }
    }
}

const PLANNING_GUIDELINES: &str = "\
1. If the task is completely finished, or it is unable to proceed based on the past steps, \
choose \"WRAP_UP\".\n\
2. If the task only needs a conversational reply unrelated to the crypto market, choose \
\"GENERAL_CHAT\".\n\
3. If the last step is pending on the user's input and the user has now agreed, retry that \
same step. If the user declined, skip it. Never retry a step that already completed.\n\
4. Never choose the same action as the immediately preceding step unless that step was left \
pending. A completed step is not repeated within a task; a request to run it again is a new task.\n\
5. An action that sets up a standing instruction, such as a limit order or a scheduled or \
conditional swap, is complete once it has been created successfully. Do not run it again.\n\
6. Choose exactly one action from the available actions and return only its name. The \
parameters must follow that action's parameter schema.";
